//! # OTP Sample App Library
//!
//! A small supervised application built on `actor-otp`, exposed as a library for integration
//! testing.
//!
//! - **[counter]**: a `Counter` GenServer and its typed [`CounterClient`](counter::CounterClient).
//! - **[flaky]**: a plain actor that crashes whenever it is told to.
//! - **[app]**: the `AppSupervisor` tree and the [`AppSystem`](app::AppSystem) that owns it.

pub mod app;
pub mod counter;
pub mod flaky;
