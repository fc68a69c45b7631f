use skein::model::DisplayMetrics;
use wasm_bindgen::prelude::*;
mod api;
mod error;
mod interop;

#[wasm_bindgen]
pub struct Viewer {
    pub(crate) inner: skein::Viewer,
}

impl Viewer {
    pub fn rs_new(width: f64, height: f64, dpi_x: f64, dpi_y: f64) -> Viewer {
        Viewer {
            inner: skein::Viewer::new((width, height), DisplayMetrics { dpi_x, dpi_y }),
        }
    }
    pub fn rs_geom_version(&self) -> u64 {
        self.inner.scene().geom_version()
    }
}
