//! Filtering and sorting of the quote table.
//!
//! Every predicate must pass for a quote to be kept. Value-based predicates
//! fail closed: a field that does not parse is `NaN` and never satisfies a
//! threshold, while the text search still applies to such rows.
use std::cmp::Ordering;
use std::time::Instant;

use board_common::command::{FilterRequest, FilterResponse, FilterStats};
use board_common::filters::{
    FilterConfig, MarketCapFilter, PercentChangeFilter, PriceChangeFilter, SortConfig,
    SortDirection, VolumeFilter,
};
use board_common::number::parse_or_nan;
use board_common::{Quote, QuoteField};

/// Total volume at or above which a quote counts as high volume.
pub const HIGH_VOLUME: f64 = 1_000_000.0;
/// Lower bound of the large market-cap band.
pub const LARGE_CAP: f64 = 1_000_000_000.0;
/// Lower bound of the medium market-cap band.
pub const MEDIUM_CAP: f64 = 100_000_000.0;

/// Run one filter and sort pass, timing it.
pub fn apply(request: &FilterRequest) -> FilterResponse {
    let started = Instant::now();
    let query = request.search_query.trim().to_lowercase();

    let mut filtered_data: Vec<Quote> = request
        .data
        .iter()
        .filter(|quote| matches_search(quote, &query) && matches_filters(quote, &request.filters))
        .cloned()
        .collect();
    sort_quotes(&mut filtered_data, &request.sort);

    FilterResponse {
        batch_timestamp: request.batch_timestamp,
        show_watchlist: request.show_watchlist,
        stats: FilterStats {
            items_in: request.data.len(),
            items_out: filtered_data.len(),
            processing_time: started.elapsed(),
        },
        filtered_data,
    }
}

/// Case-insensitive substring match on code or name; `query` must already be
/// trimmed and lowercased. An empty query matches everything.
pub fn matches_search(quote: &Quote, query: &str) -> bool {
    query.is_empty()
        || quote.code.to_lowercase().contains(query)
        || quote.name.to_lowercase().contains(query)
}

/// Conjunction of the four categorical filters.
pub fn matches_filters(quote: &Quote, filters: &FilterConfig) -> bool {
    let change = parse_or_nan(&quote.match_change);
    let volume = parse_or_nan(&quote.total_volume);

    let price_change = match filters.price_change {
        PriceChangeFilter::All => true,
        PriceChangeFilter::Up => change > 0.0,
        PriceChangeFilter::Down => change <= 0.0,
    };
    let volume_band = match filters.volume {
        VolumeFilter::All => true,
        VolumeFilter::High => volume >= HIGH_VOLUME,
        VolumeFilter::Low => volume < HIGH_VOLUME,
    };
    let percent_change = match filters.percent_change {
        PercentChangeFilter::All => true,
        PercentChangeFilter::Positive => change > 0.0,
        PercentChangeFilter::Negative => change < 0.0,
    };
    // traded value, kept under the market-cap label the UI uses
    let cap = || parse_or_nan(&quote.match_price) * volume;
    let market_cap = match filters.market_cap {
        MarketCapFilter::All => true,
        MarketCapFilter::Large => cap() >= LARGE_CAP,
        MarketCapFilter::Medium => (MEDIUM_CAP..LARGE_CAP).contains(&cap()),
        MarketCapFilter::Small => cap() < MEDIUM_CAP,
    };

    price_change && volume_band && percent_change && market_cap
}

/// Stable sort by `sort.key`; no key keeps feed order.
///
/// `matchChange` and `totalVolume` compare as numbers, with unparsable values
/// after every number in both directions. Other fields compare as text.
pub fn sort_quotes(quotes: &mut [Quote], sort: &SortConfig) {
    let Some(key) = sort.key else {
        return;
    };
    let descending = sort.direction == SortDirection::Desc;

    if key.sorts_numerically() {
        quotes.sort_by(|a, b| compare_numbers(a, b, key, descending));
    } else {
        quotes.sort_by(|a, b| {
            let ordering = a.field(key).cmp(b.field(key));
            if descending { ordering.reverse() } else { ordering }
        });
    }
}

fn compare_numbers(a: &Quote, b: &Quote, key: QuoteField, descending: bool) -> Ordering {
    let a = parse_or_nan(a.field(key));
    let b = parse_or_nan(b.field(key));
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ordering = a.total_cmp(&b);
            if descending { ordering.reverse() } else { ordering }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn rising() -> Quote {
        Quote::new("VNM")
            .with(QuoteField::Name, "Vinamilk")
            .with(QuoteField::MatchChange, "+1.5")
            .with(QuoteField::TotalVolume, "2,000,000")
            .with(QuoteField::MatchPrice, "50000")
    }

    fn all_up() -> FilterConfig {
        FilterConfig {
            price_change: PriceChangeFilter::Up,
            volume: VolumeFilter::High,
            percent_change: PercentChangeFilter::Positive,
            market_cap: MarketCapFilter::Large,
        }
    }

    fn request(data: Vec<Quote>, query: &str, filters: FilterConfig, sort: SortConfig) -> FilterRequest {
        FilterRequest {
            batch_timestamp: 9,
            data: Arc::new(data),
            search_query: query.into(),
            filters,
            sort,
            show_watchlist: true,
        }
    }

    #[test]
    fn conjunction_of_all_filters() {
        let quote = rising();
        assert!(matches_filters(&quote, &all_up()));

        let flips = [
            FilterConfig { price_change: PriceChangeFilter::Down, ..all_up() },
            FilterConfig { volume: VolumeFilter::Low, ..all_up() },
            FilterConfig { percent_change: PercentChangeFilter::Negative, ..all_up() },
            FilterConfig { market_cap: MarketCapFilter::Small, ..all_up() },
        ];
        for filters in flips {
            assert!(!matches_filters(&quote, &filters), "{:?}", filters);
        }
    }

    #[test]
    fn market_cap_bands() {
        let quote = |price: &str, volume: &str| {
            Quote::new("X")
                .with(QuoteField::MatchPrice, price)
                .with(QuoteField::TotalVolume, volume)
        };
        let medium = FilterConfig { market_cap: MarketCapFilter::Medium, ..Default::default() };
        assert!(matches_filters(&quote("100", "1,000,000"), &medium));
        assert!(!matches_filters(&quote("1000", "1,000,000"), &medium));
        let small = FilterConfig { market_cap: MarketCapFilter::Small, ..Default::default() };
        assert!(matches_filters(&quote("10", "1,000"), &small));
    }

    #[test]
    fn malformed_numbers_fail_value_filters_but_pass_search() {
        let quote = Quote::new("HPG").with(QuoteField::TotalVolume, "--");
        let high = FilterConfig { volume: VolumeFilter::High, ..Default::default() };
        let low = FilterConfig { volume: VolumeFilter::Low, ..Default::default() };
        assert!(!matches_filters(&quote, &high));
        assert!(!matches_filters(&quote, &low));
        let down = FilterConfig { price_change: PriceChangeFilter::Down, ..Default::default() };
        assert!(!matches_filters(&quote, &down));
        assert!(matches_filters(&quote, &FilterConfig::default()));
        assert!(matches_search(&quote, "hp"));
    }

    #[test]
    fn search_is_trimmed_and_case_insensitive() {
        let response = apply(&request(
            vec![rising(), Quote::new("FPT")],
            " vnm ",
            FilterConfig::default(),
            SortConfig::default(),
        ));
        assert_eq!(response.filtered_data.len(), 1);
        assert_eq!(response.filtered_data[0].code, "VNM");

        let by_name = apply(&request(vec![rising()], "MILK", FilterConfig::default(), SortConfig::default()));
        assert_eq!(by_name.stats.items_out, 1);
    }

    #[test]
    fn numeric_sort_on_formatted_volumes() {
        let data = ["1,000", "250", "10,000"]
            .iter()
            .enumerate()
            .map(|(i, v)| Quote::new(format!("S{}", i)).with(QuoteField::TotalVolume, *v))
            .collect();
        let response = apply(&request(
            data,
            "",
            FilterConfig::default(),
            SortConfig::by(QuoteField::TotalVolume, SortDirection::Asc),
        ));
        let volumes: Vec<&str> = response.filtered_data.iter().map(|q| q.total_volume.as_str()).collect();
        assert_eq!(volumes, vec!["250", "1,000", "10,000"]);
    }

    #[test]
    fn descending_sort_keeps_unparsable_last_and_is_stable() {
        let mut data = vec![
            Quote::new("A").with(QuoteField::MatchChange, "--"),
            Quote::new("B").with(QuoteField::MatchChange, "1.0"),
            Quote::new("C").with(QuoteField::MatchChange, "2.5"),
            Quote::new("D").with(QuoteField::MatchChange, "1.0"),
        ];
        sort_quotes(&mut data, &SortConfig::by(QuoteField::MatchChange, SortDirection::Desc));
        let codes: Vec<&str> = data.iter().map(|q| q.code.as_str()).collect();
        assert_eq!(codes, vec!["C", "B", "D", "A"]);
    }

    #[test]
    fn text_sort_and_no_key_keeps_order() {
        let mut data = vec![Quote::new("VNM"), Quote::new("ACB"), Quote::new("FPT")];
        sort_quotes(&mut data, &SortConfig::default());
        assert_eq!(data[0].code, "VNM");
        sort_quotes(&mut data, &SortConfig::by(QuoteField::Code, SortDirection::Asc));
        let codes: Vec<&str> = data.iter().map(|q| q.code.as_str()).collect();
        assert_eq!(codes, vec!["ACB", "FPT", "VNM"]);
    }

    #[test]
    fn response_reports_stats_and_passes_flags_through() {
        let response = apply(&request(
            vec![rising(), Quote::new("FPT")],
            "",
            all_up(),
            SortConfig::default(),
        ));
        assert_eq!(response.batch_timestamp, 9);
        assert!(response.show_watchlist);
        assert_eq!(response.stats.items_in, 2);
        assert_eq!(response.stats.items_out, 1);
    }
}
