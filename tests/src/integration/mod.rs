//! Cross-module integration flows through the public bus API.


mod lifecycle;
mod round_trip;
