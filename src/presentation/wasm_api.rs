use js_sys::{Array, Date, Function, JSON, Promise};
use std::rc::Rc;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::application::{ChartSession, RenderOutcome, SessionPorts};
use crate::domain::{
    chart::{ChartRenderer, RedrawMode},
    errors::{ChartError, ChartResult},
    logging::{LogComponent, TimeProvider},
    market_data::{CandleSeries, GranularityTable},
};
use crate::infrastructure::{BrowserTimeProvider, DomErrorNotifier, GlooTimer, OandaHttpClient};
use crate::presentation::ChartOptions;
use crate::time_utils::TimeParams;
use crate::{log_info, log_warn};

/// Forwards the series to a JS draw callback as
/// `draw(rows, animate)` with rows `[Date, low, close, open, high]`.
pub struct JsChartRenderer {
    draw: Function,
}

impl JsChartRenderer {
    pub fn new(draw: Function) -> Self {
        Self { draw }
    }

    fn rows(series: &CandleSeries) -> Array {
        series
            .candles()
            .iter()
            .map(|candle| {
                let row = Array::new();
                row.push(&Date::new(&JsValue::from_f64(candle.timestamp.value() as f64)));
                row.push(&JsValue::from_f64(candle.ohlc.low.value()));
                row.push(&JsValue::from_f64(candle.ohlc.close.value()));
                row.push(&JsValue::from_f64(candle.ohlc.open.value()));
                row.push(&JsValue::from_f64(candle.ohlc.high.value()));
                JsValue::from(row)
            })
            .collect()
    }

    fn call(&self, rows: &Array, animate: bool) {
        if let Err(e) = self.draw.call2(&JsValue::NULL, rows, &JsValue::from_bool(animate)) {
            log_warn!(LogComponent::Presentation("JsChartRenderer"), "draw callback threw: {:?}", e);
        }
    }
}

impl ChartRenderer for JsChartRenderer {
    fn draw(&self, series: &CandleSeries, mode: RedrawMode) {
        self.call(&Self::rows(series), mode.is_animated());
    }

    fn clear(&self) {
        self.call(&Array::new(), false);
    }
}

fn to_js_error(error: ChartError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

/// Deserialize a plain JS object through its JSON form.
fn from_js_object<T: serde::de::DeserializeOwned + Default>(value: &JsValue) -> ChartResult<T> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    let json: String = JSON::stringify(value)
        .map(String::from)
        .map_err(|_| ChartError::InvalidParameter("argument is not serializable".to_string()))?;
    serde_json::from_str(&json).map_err(|e| ChartError::InvalidParameter(e.to_string()))
}

fn outcome_promise<F>(future: F) -> Promise
where
    F: std::future::Future<Output = ChartResult<RenderOutcome>> + 'static,
{
    future_to_promise(async move {
        let outcome = future.await.map_err(to_js_error)?;
        Ok(JsValue::from_f64(outcome.candles as f64))
    })
}

/// Candlestick chart bound to the OANDA candles endpoint.
///
/// Every parameter setter rebuilds the chart and resolves with the number of
/// candles drawn.
#[wasm_bindgen]
pub struct CandlestickChart {
    session: ChartSession<OandaHttpClient>,
}

#[wasm_bindgen]
impl CandlestickChart {
    #[wasm_bindgen(constructor)]
    pub fn new(draw: Function, options: JsValue) -> Result<CandlestickChart, JsValue> {
        let options: ChartOptions = from_js_object(&options).map_err(to_js_error)?;
        let clock = Rc::new(BrowserTimeProvider::new());
        let params = options.parameters(clock.current_timestamp()).map_err(to_js_error)?;

        let ports = SessionPorts {
            provider: Rc::new(OandaHttpClient::new(options.api.clone())),
            renderer: Rc::new(JsChartRenderer::new(draw)),
            notifier: Rc::new(DomErrorNotifier::new(options.container_id(), options.sync.notification_ms)),
            timer: Rc::new(GlooTimer),
            clock,
        };

        log_info!(
            LogComponent::Presentation("CandlestickChart"),
            "📊 Chart created for {} {}",
            params.instrument,
            params.granularity
        );

        Ok(Self { session: ChartSession::with_parameters(ports, options.sync, params) })
    }

    pub fn render(&self) -> Promise {
        let session = self.session.clone();
        outcome_promise(async move { session.render().await })
    }

    pub fn reset(&self) {
        self.session.reset();
    }

    #[wasm_bindgen(js_name = setGranularity)]
    pub fn set_granularity(&self, code: String) -> Promise {
        let session = self.session.clone();
        outcome_promise(async move { session.set_granularity(&code).await })
    }

    #[wasm_bindgen(js_name = setInstrument)]
    pub fn set_instrument(&self, instrument: String) -> Promise {
        let session = self.session.clone();
        outcome_promise(async move { session.set_instrument(&instrument).await })
    }

    /// `params`: `{year?, month?, day?, hours?, minutes?, seconds?}`, month 1-based.
    #[wasm_bindgen(js_name = setStartTime)]
    pub fn set_start_time(&self, params: JsValue) -> Promise {
        let session = self.session.clone();
        let params = from_js_object::<TimeParams>(&params);
        outcome_promise(async move { session.set_start_time(params?).await })
    }

    #[wasm_bindgen(js_name = setEndTime)]
    pub fn set_end_time(&self, params: JsValue) -> Promise {
        let session = self.session.clone();
        let params = from_js_object::<TimeParams>(&params);
        outcome_promise(async move { session.set_end_time(params?).await })
    }

    #[wasm_bindgen(js_name = toggleStreaming)]
    pub fn toggle_streaming(&self, enabled: bool) -> Promise {
        let session = self.session.clone();
        outcome_promise(async move { session.toggle_streaming(enabled).await })
    }

    #[wasm_bindgen(getter, js_name = candleCount)]
    pub fn candle_count(&self) -> usize {
        self.session.candle_count()
    }

    #[wasm_bindgen(getter, js_name = isStreaming)]
    pub fn is_streaming(&self) -> bool {
        self.session.is_streaming()
    }

    #[wasm_bindgen(getter)]
    pub fn granularity(&self) -> String {
        self.session.params().granularity.code().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn instrument(&self) -> String {
        self.session.params().instrument.value().to_string()
    }

    /// Accepted granularity codes, shortest first.
    pub fn granularities() -> Array {
        GranularityTable::list_codes().into_iter().map(JsValue::from_str).collect()
    }
}
