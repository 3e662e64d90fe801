pub mod background;
pub mod consts;
pub mod contrast;
pub mod error;
pub mod frame;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod source;
