//! Runs the MongoDB store against a live server. Every test is skipped unless
//! `MONGO_URI` is set (directly or through `.env.test`). Each test works in its
//! own throwaway database.

use chrono::{Duration, Utc};
use mongodb::{bson::doc, Database};
use std::sync::Arc;

use mathtutor_api::{
    metrics::DB_OPERATIONS_TOTAL,
    models::{Account, LessonScoreOutcome, Level, SkillLevel},
    services::progression_service::ProgressionService,
    store::{AccountStore, MongoStore, ProgressionStore, StoreError},
};

struct MongoFixture {
    store: Arc<MongoStore>,
    db: Database,
}

impl MongoFixture {
    async fn teardown(self) {
        self.db.drop().await.expect("Failed to drop test database");
    }
}

async fn mongo_fixture() -> Option<MongoFixture> {
    dotenvy::from_filename(".env.test").ok();
    let Ok(uri) = std::env::var("MONGO_URI") else {
        eprintln!("MONGO_URI not set, skipping MongoDB store test");
        return None;
    };

    let client = mongodb::Client::with_uri_str(&uri)
        .await
        .expect("Failed to connect to test MongoDB");
    let db = client.database(&format!("mathtutor_test_{}", uuid::Uuid::new_v4().simple()));
    let store = MongoStore::new(db.clone());
    store
        .ensure_indexes()
        .await
        .expect("Failed to create test indexes");

    for (id, username) in [("u-ada", "ada"), ("u-bob", "bob")] {
        store
            .create_account(&Account {
                id: id.to_string(),
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: "not-a-real-hash".to_string(),
                skill_level: SkillLevel::None,
                created_at: Utc::now(),
            })
            .await
            .expect("Failed to seed test account");
    }

    Some(MongoFixture {
        store: Arc::new(store),
        db,
    })
}

#[tokio::test]
async fn skill_ratchet_never_lowers_the_rank() {
    let Some(fixture) = mongo_fixture().await else {
        return;
    };
    let store = fixture.store.clone();

    let raised = store
        .raise_skill_level("u-ada", SkillLevel::Intermediate)
        .await
        .unwrap();
    assert_eq!(raised.previous, SkillLevel::None);
    assert_eq!(raised.current, SkillLevel::Intermediate);

    for proposal in [SkillLevel::Beginner, SkillLevel::None, SkillLevel::Intermediate] {
        let unchanged = store.raise_skill_level("u-ada", proposal).await.unwrap();
        assert!(!unchanged.updated());
        assert_eq!(unchanged.current, SkillLevel::Intermediate);
    }
    assert_eq!(
        store.skill_level("u-ada").await.unwrap(),
        SkillLevel::Intermediate
    );

    let expert = store
        .raise_skill_level("u-ada", SkillLevel::Expert)
        .await
        .unwrap();
    assert!(expert.updated());

    assert!(matches!(
        store.raise_skill_level("u-ghost", SkillLevel::Beginner).await,
        Err(StoreError::NotFound(_))
    ));

    fixture.teardown().await;
}

#[tokio::test]
async fn concurrent_scores_settle_at_the_maximum() {
    let Some(fixture) = mongo_fixture().await else {
        return;
    };
    let service = Arc::new(ProgressionService::new(
        fixture.store.clone(),
        fixture.store.clone(),
    ));

    let (a, b) = tokio::join!(
        {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .record_lesson_score("ada", Level::Intermediate, 80)
                    .await
            })
        },
        {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .record_lesson_score("ada", Level::Intermediate, 60)
                    .await
            })
        },
    );
    a.unwrap().unwrap();
    b.unwrap().unwrap();

    let top = fixture
        .store
        .top_lesson_scores(Level::Intermediate, 10)
        .await
        .unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].score, 80);

    fixture.teardown().await;
}

#[tokio::test]
async fn equal_best_keeps_first_achievement() {
    let Some(fixture) = mongo_fixture().await else {
        return;
    };
    let store = fixture.store.clone();
    let first_at = Utc::now();

    let (outcome, created) = store
        .record_lesson_score("u-ada", "ada", Level::Beginner, 90, first_at)
        .await
        .unwrap();
    assert_eq!(outcome, LessonScoreOutcome::Created);

    let (outcome, kept) = store
        .record_lesson_score(
            "u-ada",
            "ada",
            Level::Beginner,
            90,
            first_at + Duration::seconds(5),
        )
        .await
        .unwrap();
    assert_eq!(outcome, LessonScoreOutcome::NoImprovement);
    assert_eq!(kept.achieved_at, created.achieved_at);

    // the returned record matches what the leaderboard reads back
    let top = store.top_lesson_scores(Level::Beginner, 10).await.unwrap();
    assert_eq!(top, vec![created.clone()]);

    let (outcome, improved) = store
        .record_lesson_score(
            "u-ada",
            "ada",
            Level::Beginner,
            95,
            first_at + Duration::seconds(10),
        )
        .await
        .unwrap();
    assert_eq!(outcome, LessonScoreOutcome::Improved);
    let top = store.top_lesson_scores(Level::Beginner, 10).await.unwrap();
    assert_eq!(top, vec![improved]);

    fixture.teardown().await;
}

#[tokio::test]
async fn repeat_badge_award_stores_one_document() {
    let Some(fixture) = mongo_fixture().await else {
        return;
    };
    let store = fixture.store.clone();
    let upserts = || {
        DB_OPERATIONS_TOTAL
            .with_label_values(&["update_one", "badges", "success"])
            .get()
    };
    let upserts_before = upserts();

    let first = store
        .award_badge("u-ada", Level::Expert, Utc::now())
        .await
        .unwrap();
    assert!(first.newly_awarded);

    let second = store
        .award_badge("u-ada", Level::Expert, Utc::now() + Duration::seconds(5))
        .await
        .unwrap();
    assert!(!second.newly_awarded);
    assert_eq!(second.badge, first.badge);
    assert_eq!(upserts() - upserts_before, 2);

    let stored = fixture
        .db
        .collection::<mongodb::bson::Document>("badges")
        .count_documents(doc! { "user_id": "u-ada" })
        .await
        .unwrap();
    assert_eq!(stored, 1);

    assert!(store.has_badge("u-ada", Level::Expert).await.unwrap());
    assert!(!store.has_badge("u-ada", Level::Beginner).await.unwrap());
    assert_eq!(store.badges_for_user("u-ada").await.unwrap().len(), 1);

    fixture.teardown().await;
}
