mod destination;
mod migration;
mod transform;
mod verify;
mod window;

pub use destination::DestinationError;
pub use migration::MigrationError;
pub use transform::TransformError;
pub use verify::VerifyError;
pub use window::WindowError;
