#![deny(missing_docs)]

//! # Parameters Module
//!
//! - **style**: locations, styles, defaults and location/style validation.
//! - **escape**: percent-encoding policies.
//! - **codec**: style/explode serialization into wire text.
//! - **descriptor**: resolved parameters carrying their encoding settings.

pub mod codec;
pub mod descriptor;
pub mod escape;
pub mod style;

pub use codec::{encode, ParameterEncoding, WireForm};
pub use descriptor::{ParameterDescriptor, ParameterPayload};
pub use style::{ParamLocation, ParamStyle};
