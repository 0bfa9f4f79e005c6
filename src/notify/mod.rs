// src/notify/mod.rs
mod observer;

pub use observer::{ConsoleNotifier, LogObserver, NotifyPolicy, ObserverSet, SweepObserver};
