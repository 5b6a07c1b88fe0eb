use chrono::{DateTime, NaiveDate};
use tempfile::tempdir;

use queue_analyzer_rust::aggregation::TemporalAggregator;
use queue_analyzer_rust::extraction::{QueueEstimator, Vocabulary};
use queue_analyzer_rust::ingest::telegram::TelegramExportReader;
use queue_analyzer_rust::ingest::{merge_sorted, MessageFeed, MessageSource, RawMessage};
use queue_analyzer_rust::model::{training_set, LeastSquaresModel, Regressor};
use queue_analyzer_rust::roster::{followers_by_date, ArtistRecord};
use queue_analyzer_rust::store::{assemble_features, FeatureStore};
use queue_analyzer_rust::weather::DailyWeather;

fn message(timestamp: &str, text: &str) -> RawMessage {
    RawMessage {
        sender: "tester".into(),
        text: text.into(),
        timestamp: DateTime::parse_from_rfc3339(timestamp).unwrap(),
        source: MessageSource::Telegram,
    }
}

fn aggregator() -> TemporalAggregator {
    TemporalAggregator::new(QueueEstimator::new(Vocabulary::new()))
}

// One weekend of chat traffic through the whole extraction/aggregation
// path. 2024-03-01 is a Friday.
#[test]
fn test_weekend_of_reports_end_to_end() {
    let records = vec![
        message("2024-03-01T18:00:00+01:00", "anyone in line yet?"),
        message("2024-03-01T23:30:00+01:00", "2 hours from the kiosk corner"),
        message("2024-03-02T00:15:00+01:00", "about 1.5 h right now"),
        message("2024-03-02T23:00:00+01:00", "30 mins wait"),
        message("2024-03-03T03:00:00+01:00", "line reaches the späti"),
        message("2024-03-05T14:00:00+01:00", "3 hours"), // Tuesday, ignored
    ];

    let rows = aggregator().aggregate(&records);

    // Tuesday never shows up; 03:00 Sunday folds into Saturday night
    let dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
    assert!(dates.contains(&NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
    assert!(dates.contains(&NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()));
    assert!(!dates.contains(&NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()));

    for row in &rows {
        assert!(row.max_waiting_time >= 0.0);
        assert!(row.max_waiting_time <= 10.0);
    }
}

#[tokio::test]
async fn test_export_to_store_round_trip() {
    let dir = tempdir().unwrap();

    let export = r#"
        <html><body>
        <div class="message">
            <div class="date" title="01.03.2024 23:30:00 UTC+01:00">23:30</div>
            <div class="from_name">doorwatcher</div>
            <div class="text">2 hours</div>
        </div>
        <div class="message">
            <div class="date" title="01.03.2024 23:45:00 UTC+01:00">23:45</div>
            <div class="from_name">doorwatcher</div>
            <div class="text">4 hours by now</div>
        </div>
        </body></html>
    "#;
    tokio::fs::write(dir.path().join("messages.html"), export)
        .await
        .unwrap();

    let reader = TelegramExportReader::new(dir.path());
    let messages = reader.fetch().await.unwrap();
    assert_eq!(messages.len(), 2);

    let rows = aggregator().aggregate(&messages);
    assert_eq!(rows.len(), 1);

    let store = FeatureStore::new(dir.path().join("data"));
    store.initialize().await.unwrap();
    store.save_estimates("estimates", &rows).await.unwrap();

    let loaded = store.load_estimates("estimates").await.unwrap();
    assert_eq!(loaded, rows);
}

#[test]
fn test_features_feed_the_model() {
    // Two weekends of hour reports, one aggregated row per night
    let records = vec![
        message("2024-03-01T23:30:00+01:00", "2 hours"),
        message("2024-03-02T18:00:00+01:00", "3 hours easily"),
        message("2024-03-03T18:00:00+01:00", "1 hour tonight"),
        message("2024-03-08T23:30:00+01:00", "4 hours"),
        message("2024-03-09T18:00:00+01:00", "2 hours again"),
    ];
    let estimates = aggregator().aggregate(&records);
    assert_eq!(estimates.len(), 5);

    let followers = [400_000, 90_000, 150_000, 320_000, 60_000];
    let temps = [4.0, 2.5, 7.0, 3.0, 5.5];
    let precip = [0.0, 1.2, 0.4, 2.0, 0.0];

    let mut roster = Vec::new();
    let mut weather = Vec::new();
    for (i, estimate) in estimates.iter().enumerate() {
        roster.push(ArtistRecord {
            date: estimate.date,
            name: format!("artist-{}", i),
            followers: followers[i],
            location: "Berghain".into(),
            soundcloud_url: None,
        });
        weather.push(DailyWeather {
            date: estimate.date,
            min_temp_c: temps[i],
            precip_mm: precip[i],
            chance_of_rain: Some(20.0),
        });
    }

    let features = assemble_features(&estimates, &followers_by_date(&roster), &weather);
    assert_eq!(features.len(), estimates.len());

    let (x, y) = training_set(&features);
    assert_eq!(x.len(), 5);

    let mut model = LeastSquaresModel::new();
    model.fit(&x, &y).unwrap();
    assert!(model.predict(&x[0]) >= 0.0);
    assert!(model.predict(&[120_000.0, 5.0, 0.0]).is_finite());
}

#[test]
fn test_merged_sources_share_one_stream() {
    let telegram = vec![message("2024-03-02T23:00:00+01:00", "2 hours")];
    let reddit = vec![RawMessage {
        sender: "t1_abc".into(),
        text: "30 mins wait".into(),
        timestamp: DateTime::parse_from_rfc3339("2024-03-02T22:00:00+01:00").unwrap(),
        source: MessageSource::Reddit,
    }];

    let merged = merge_sorted(vec![telegram, reddit]);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].source, MessageSource::Reddit);

    let rows = aggregator().aggregate(&merged);
    assert_eq!(rows.len(), 1);
}
