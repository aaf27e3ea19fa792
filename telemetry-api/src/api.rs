use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("report submitted with an empty vehicleId")]
    EmptyVehicleId,

    #[error("invalid report could not be processed")]
    NonRetryableSinkError,

    #[error("transient delivery error, please retry")]
    DeliveryFailed,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::EmptyVehicleId => (StatusCode::BAD_REQUEST, self.to_string()),

            ApiError::NonRetryableSinkError => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }

            ApiError::DeliveryFailed => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
        }
        .into_response()
    }
}
