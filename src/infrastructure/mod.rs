pub mod cdp_dom;
pub mod js_executor;

pub use cdp_dom::CdpDom;
pub use js_executor::JsExecutor;
