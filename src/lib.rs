//! SiK-protocol UART bootloader for Si1000-class radio modems.
//!
//! The device side ([`boot`], [`dispatcher`], [`staging`]) is allocation
//! free and talks to hardware only through [`transport::ByteTransport`] and
//! [`flash::FlashInterface`]. The host side ([`client`], [`hex`], [`api`])
//! uploads firmware over a serial port.

pub mod api;
pub mod boot;
pub mod client;
pub mod dispatcher;
pub mod emulator;
pub mod flash;
pub mod hex;
pub mod operation;
pub mod protocol;
pub mod selector;
pub mod serial;
pub mod staging;
pub mod targets;
pub mod transport;

#[cfg(test)]
mod loopback;
