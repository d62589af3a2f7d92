//! Cached `Date` header value.
//!
//! Formatting an IMF-fixdate on every response is wasted work under load, so one
//! formatted value is shared by all connections and re-rendered lazily once it is older
//! than [`REFRESH_INTERVAL`]. Readers never block: a stale read simply formats a fresh
//! value and swaps it in.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use bytes::Bytes;
use once_cell::sync::Lazy;

const REFRESH_INTERVAL: Duration = Duration::from_millis(500);

static DATE_SERVICE: Lazy<DateService> = Lazy::new(DateService::new);

#[derive(Debug)]
struct Rendered {
    at: Instant,
    value: Bytes,
}

#[derive(Debug)]
pub struct DateService {
    current: ArcSwap<Rendered>,
}

impl DateService {
    pub fn global() -> &'static DateService {
        &DATE_SERVICE
    }

    fn new() -> Self {
        Self { current: ArcSwap::from_pointee(render()) }
    }

    /// The current date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
    pub fn http_date(&self) -> Bytes {
        let current = self.current.load();
        if current.at.elapsed() < REFRESH_INTERVAL {
            return current.value.clone();
        }

        let fresh = Arc::new(render());
        let value = fresh.value.clone();
        self.current.store(fresh);
        value
    }
}

fn render() -> Rendered {
    let mut buf = faf_http_date::get_date_buff_no_key();
    faf_http_date::get_date_no_key(&mut buf);
    Rendered { at: Instant::now(), value: Bytes::from_owner(buf) }
}
