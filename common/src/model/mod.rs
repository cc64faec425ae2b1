pub mod certificate;
pub mod design;
pub mod mapping;
