mod ui_parameter;

pub use ui_parameter::UIParameter;
