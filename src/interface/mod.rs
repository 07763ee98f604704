//! # Interface Layer
//!
//! The outward-facing surface of the service: the tonic implementation of the
//! `AIProjectHelper` gRPC service and its generated protobuf types.

pub mod grpc;
pub mod proto;
