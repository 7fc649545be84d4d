pub mod paywall;
