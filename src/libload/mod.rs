// src/libload/mod.rs

//! Runtime loading of shared libraries.

pub mod systemd_dlopen2;
