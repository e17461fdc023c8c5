mod state;

pub use state::{AppState, CachedResponse, Detector, LiveSnapshot, ResponseCache};
