//! MFI (Money Flow Index), a volume weighted RSI.
//!
//! typical price = (H + L + C) / 3, money flow = typical price * volume.
//! Over the last n typical-price changes, flow on up days is positive and flow
//! on down days is negative; unchanged days count for neither side.
//!
//! MFI = 100 - 100 / (1 + positive / negative); negative == 0 gives 100.
//! Warmup: first n bars are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_mfi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    if period == 0 || bars.len() < 2 {
        return IndicatorSeries::invalid(IndicatorType::Mfi(period), bars.iter().map(|b| b.date));
    }

    // signed flow per change; index i describes the move into bar i + 1
    let flows: Vec<(f64, f64)> = bars
        .windows(2)
        .map(|w| {
            let prev_tp = w[0].typical_price();
            let tp = w[1].typical_price();
            let flow = w[1].money_flow();
            if tp > prev_tp {
                (flow, 0.0)
            } else if tp < prev_tp {
                (0.0, flow)
            } else {
                (0.0, 0.0)
            }
        })
        .collect();

    let mut values = Vec::with_capacity(bars.len());
    values.push(IndicatorPoint {
        date: bars[0].date,
        valid: false,
        value: IndicatorValue::Simple(0.0),
    });

    let mut positive = 0.0;
    let mut negative = 0.0;

    for (i, &(pos, neg)) in flows.iter().enumerate() {
        positive += pos;
        negative += neg;
        if i >= period {
            positive -= flows[i - period].0;
            negative -= flows[i - period].1;
        }

        let valid = i + 1 >= period;
        let mfi = if valid { money_flow_index(positive, negative) } else { 0.0 };
        values.push(IndicatorPoint {
            date: bars[i + 1].date,
            valid,
            value: IndicatorValue::Simple(mfi),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Mfi(period),
        values,
    }
}

fn money_flow_index(positive: f64, negative: f64) -> f64 {
    // rolling subtraction can leave tiny negative residue
    let positive = positive.max(0.0);
    let negative = negative.max(0.0);
    if negative <= f64::EPSILON * positive.max(1.0) {
        return 100.0;
    }
    (100.0 - 100.0 / (1.0 + positive / negative)).clamp(0.0, 100.0)
}
