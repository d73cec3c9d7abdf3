// Public API - what other modules can use
pub use registry::RoomRegistry;

// Internal modules
mod registry;
