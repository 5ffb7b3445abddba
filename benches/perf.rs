use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use matchsight::ev::expected_value;
use matchsight::fixtures_fetch::parse_fixtures_json;
use matchsight::model::{FeatureVector, MatchModels};
use matchsight::team_stats_fetch::parse_team_stats_json;
use matchsight::training_data::{OUTCOME_AWAY, OUTCOME_DRAW, OUTCOME_HOME, parse_training_csv};

fn training_csv(rows: usize) -> String {
    let mut csv = String::from(
        "Div,Date,HomeTeam,AwayTeam,FTHG,FTAG,FTR,HS,AS,HST,AST,HF,AF,HC,AC\n",
    );
    for i in 0..rows {
        let (ftr, fthg, ftag) = match i % 3 {
            0 => ("H", 2, 0),
            1 => ("D", 1, 1),
            _ => ("A", 0, 2),
        };
        csv.push_str(&format!(
            "E0,12/08/2023,Home {i},Away {i},{fthg},{ftag},{ftr},{},{},{},{},{},{},{},{}\n",
            10 + i % 9,
            8 + i % 7,
            4 + i % 5,
            3 + i % 4,
            9 + i % 6,
            10 + i % 5,
            4 + i % 6,
            3 + i % 5,
        ));
    }
    csv
}

fn fitted_models() -> MatchModels {
    let set = parse_training_csv(&training_csv(380)).expect("valid training csv");
    MatchModels::fit(&set).expect("models fit on synthetic season")
}

fn bench_training_csv_parse(c: &mut Criterion) {
    let csv = training_csv(380);
    c.bench_function("training_csv_parse", |b| {
        b.iter(|| {
            let set = parse_training_csv(black_box(&csv)).unwrap();
            black_box(set.len());
        })
    });
}

fn bench_model_fit(c: &mut Criterion) {
    let set = parse_training_csv(&training_csv(380)).expect("valid training csv");
    c.bench_function("model_fit", |b| {
        b.iter(|| {
            let models = MatchModels::fit(black_box(&set)).unwrap();
            black_box(models.samples());
        })
    });
}

fn bench_model_predict(c: &mut Criterion) {
    let models = fitted_models();
    let features = FeatureVector {
        values: [0.0, 0.0, 14.0, 9.0, 6.0, 3.0, 11.0, 12.0, 7.0, 4.0],
    };
    c.bench_function("model_predict", |b| {
        b.iter(|| {
            let p = models.predict(black_box(&features));
            black_box(p.p_home);
        })
    });
}

fn bench_fixtures_parse(c: &mut Criterion) {
    c.bench_function("fixtures_parse", |b| {
        b.iter(|| {
            let rows = parse_fixtures_json(black_box(FIXTURES_JSON)).unwrap();
            black_box(rows.len());
        })
    });
}

fn bench_team_stats_parse(c: &mut Criterion) {
    c.bench_function("team_stats_parse", |b| {
        b.iter(|| {
            let stats = parse_team_stats_json(black_box(TEAM_STATS_JSON)).unwrap();
            black_box(stats.shots_total);
        })
    });
}

fn bench_expected_value(c: &mut Criterion) {
    c.bench_function("expected_value", |b| {
        b.iter(|| {
            let mut total = 0.0;
            for p in [OUTCOME_HOME, OUTCOME_DRAW, OUTCOME_AWAY] {
                total += expected_value(black_box(30.0 + p as f32 * 10.0), black_box(2.5));
            }
            black_box(total);
        })
    });
}

criterion_group!(
    perf,
    bench_training_csv_parse,
    bench_model_fit,
    bench_model_predict,
    bench_fixtures_parse,
    bench_team_stats_parse,
    bench_expected_value
);
criterion_main!(perf);

static FIXTURES_JSON: &str = include_str!("../tests/fixtures/apifootball_fixtures.json");
static TEAM_STATS_JSON: &str = include_str!("../tests/fixtures/apifootball_team_stats.json");
