use crate::domain::chart::RedrawMode;
use crate::domain::market_data::CandleSeries;

/// Drawing surface for the series. Implemented outside the core.
pub trait ChartRenderer {
    /// Draw the whole series.
    fn draw(&self, series: &CandleSeries, mode: RedrawMode);

    /// Remove everything from the surface.
    fn clear(&self);
}

/// Transient, auto-dismissing error display
pub trait ErrorNotifier {
    fn notify_error(&self, message: &str, error_type: &str);
}
