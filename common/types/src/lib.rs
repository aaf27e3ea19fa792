mod location;

pub use location::VehicleLocation;
