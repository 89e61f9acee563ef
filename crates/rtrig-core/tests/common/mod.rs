#![allow(dead_code)]

pub mod build_server;
