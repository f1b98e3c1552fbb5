// Adapters layer: concrete implementations for external systems (DXF files, asset directory, REST store).

pub mod assets;
pub mod dxf;
pub mod http;
