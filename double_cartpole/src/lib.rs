//! # Double Cart-Pole
//!
//! A cart on a horizontal track carries two poles chained by pivots; an agent
//! pushes the cart left or right to keep both poles upright and the cart near
//! the middle of the track.
//!
//! ## The Crates
//!
//! -   **[`physics`]:** builds the cart, poles, track and joints on top of the
//!     `rapier2d` engine and reads their state back.
//! -   **[`render`]:** draws the scene into 800×800 frames and shows them in a
//!     window, writes them as PNG files or keeps them in memory.
//! -   **[`ml`]:** the environment contract, the double cart-pole environment
//!     and its id registry, and a PPO trainer producing a JSON policy.
//! -   **`double_cartpole`:** this crate. [`app`] holds the `train` and
//!     `evaluate` programs behind the `double-cartpole` binary.
//!
//! ## Getting Started
//!
//! ```text
//! double-cartpole train --timesteps 1500000 --output new_agent.json
//! double-cartpole evaluate --policy new_agent.json --render --render-mode frames
//! ```

pub mod app;

pub use ml;
pub use physics;
pub use render;
