//! End-to-end scenarios over the core building blocks, with fixture data only.

use chrono::NaiveDate;
use finboard_core::allocator::{allocate, AllocatorConfig, RiskProfile};
use finboard_core::data::{
    fetch_universe, CachedProvider, DataError, DataProvider, DataSource, FetchResult,
    MacroProvider, SilentProgress, StatCanCsvProvider,
};
use finboard_core::domain::{Bar, FieldValue, Fundamentals, PriceSeries};
use finboard_core::fundamentals::{ComparisonTable, Metric};
use finboard_core::macro_series::{annual_mean, year_over_year, MacroObservation};
use finboard_core::returns::ReturnMatrix;
use finboard_core::rng::SeedHierarchy;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn conservative_prefers_the_flat_asset() {
    let m = ReturnMatrix::new(
        vec!["SWING".into(), "FLAT".into()],
        vec![
            vec![0.01, 0.0],
            vec![-0.01, 0.0],
            vec![0.01, 0.0],
            vec![-0.01, 0.0],
        ],
    )
    .unwrap();
    let run = allocate(
        &m,
        RiskProfile::Conservative,
        &AllocatorConfig::default(),
        &mut StdRng::seed_from_u64(42),
    )
    .unwrap();
    let w = &run.allocation.weights;
    assert!(w[0] < 0.01, "weights {w:?}");
    assert!(w[1] > 0.99, "weights {w:?}");
}

#[test]
fn seeded_allocation_is_reproducible_across_symbol_order() {
    let returns: [(&str, [f64; 4]); 3] = [
        ("A", [0.010, -0.006, 0.012, 0.004]),
        ("B", [0.002, 0.001, -0.003, 0.002]),
        ("C", [-0.004, 0.007, 0.001, -0.002]),
    ];
    let matrix = |order: &[usize]| {
        let symbols = order.iter().map(|&i| returns[i].0.to_string()).collect();
        let rows = (0..4)
            .map(|t| order.iter().map(|&i| returns[i].1[t]).collect())
            .collect();
        ReturnMatrix::new(symbols, rows).unwrap()
    };
    let seeds = SeedHierarchy::new(42);
    let cfg = AllocatorConfig {
        samples: 1_000,
        ..AllocatorConfig::default()
    };

    for profile in RiskProfile::ALL {
        let run = |m: &ReturnMatrix| {
            let mut rng = seeds.rng_for(m.symbols(), profile);
            allocate(m, profile, &cfg, &mut rng).unwrap().allocation
        };
        let abc = run(&matrix(&[0, 1, 2]));
        let cab = run(&matrix(&[2, 0, 1]));
        for (sym, w) in abc.symbols.iter().zip(&abc.weights) {
            let pos = cab.symbols.iter().position(|s| s == sym).unwrap();
            assert!(
                (w - cab.weights[pos]).abs() < 1e-12,
                "{profile}: weight of {sym} differs: {w} vs {}",
                cab.weights[pos]
            );
        }
        assert!((abc.expected_return - cab.expected_return).abs() < 1e-12);
    }
}

#[test]
fn monthly_constant_series_resamples_to_constant() {
    let obs: Vec<MacroObservation> = (2014..=2016)
        .flat_map(|y| (1..=12).map(move |m| MacroObservation { date: d(y, m, 1), value: 2.5 }))
        .collect();
    let annual = annual_mean(&obs);
    assert_eq!(annual.iter().map(|a| a.year).collect::<Vec<_>>(), vec![2014, 2015, 2016]);
    assert!(annual.iter().all(|a| (a.value.unwrap() - 2.5).abs() < 1e-12));

    let yoy = year_over_year(&annual);
    assert_eq!(yoy[0].value, None);
    assert_eq!(yoy[1].value, Some(0.0));
    assert_eq!(yoy[2].value, Some(0.0));
}

#[test]
fn statcan_table_to_yearly_change() {
    let dir = tempfile::tempdir().unwrap();
    let mut csv = String::from("REF_DATE,GEO,DGUID,Rates,UOM,VALUE\n");
    for (year, rate) in [(2019, 2.0), (2020, 1.0), (2021, 0.5)] {
        for m in 1..=12 {
            csv.push_str(&format!("{year}-{m:02},Canada,x,Bank rate,Percent,{rate}\n"));
            csv.push_str(&format!("{year}-{m:02},Canada,x,Prime rate,Percent,9.9\n"));
        }
    }
    std::fs::write(dir.path().join("10100122.csv"), csv).unwrap();

    let provider = StatCanCsvProvider::new(dir.path(), d(2014, 1, 1));
    let series = provider
        .table("10-10-0122-01", &[("Rates".into(), "Bank rate".into())])
        .unwrap();
    assert_eq!(series.observations.len(), 36);

    let yoy = year_over_year(&annual_mean(&series.observations));
    assert!((yoy[1].value.unwrap() + 50.0).abs() < 1e-9);
    assert!((yoy[2].value.unwrap() + 50.0).abs() < 1e-9);
}

#[test]
fn missing_ebitda_renders_not_available() {
    let f = Fundamentals {
        current_price: Some(41.5),
        ..Fundamentals::empty("SU.TO")
    };
    let table = ComparisonTable::build(&[f]);
    let ebitda = &table.row(Metric::Ebitda).unwrap().values[0];
    assert_eq!(*ebitda, FieldValue::Missing);
    assert_eq!(ebitda.to_string(), "N/A");
    assert_eq!(table.row(Metric::CurrentPrice).unwrap().values[0].to_string(), "41.50");
}

struct FlakyProvider;

impl DataProvider for FlakyProvider {
    fn name(&self) -> &str {
        "flaky"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        if symbol == "DOWN.TO" {
            return Err(DataError::Timeout { secs: 15 });
        }
        let bars = (0..5)
            .map(|i| {
                let p = 10.0 + i as f64;
                Bar {
                    date: start + chrono::Duration::days(i),
                    open: p,
                    high: p,
                    low: p,
                    close: p,
                    adj_close: p,
                    volume: 100,
                }
            })
            .collect();
        Ok(FetchResult {
            series: PriceSeries::new(symbol, bars).unwrap(),
            source: DataSource::Fixture,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[test]
fn universe_skips_failures_and_feeds_allocator() {
    let provider = CachedProvider::new(FlakyProvider);
    let symbols: Vec<String> = ["RY.TO", "DOWN.TO", "TD.TO"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let (start, end) = (d(2024, 1, 1), d(2024, 1, 31));
    let fetched = fetch_universe(&symbols, &provider, &SilentProgress, start, end);

    assert_eq!(fetched.series.len(), 2);
    assert_eq!(fetched.warnings.len(), 1);
    assert!(fetched.warnings[0].reason.contains("timed out"));

    let (matrix, warnings) = ReturnMatrix::from_series(&fetched.series).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(matrix.n_obs(), 4);

    let again = fetch_universe(&symbols, &provider, &SilentProgress, d(2024, 1, 1), d(2024, 1, 31));
    assert_eq!(again.sources.get("RY.TO"), Some(&DataSource::SessionCache));
}
