use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::sync::Arc;
use vidtube::db::repository::NewUser;
use vidtube::db::{collections, new_object_id, Db, DocumentStore, Filter, MemoryStore};
use vidtube::models::{LikeTarget, Video};
use vidtube::services::read_model::{self, VideoListParams};

const USERS: usize = 200;
const VIDEOS_PER_USER: usize = 5;

/// Seed a store with a small social graph. Returns the store and the id of
/// the busiest user.
fn seed(rt: &tokio::runtime::Runtime) -> (Arc<MemoryStore>, String) {
    let store = Arc::new(MemoryStore::new());
    let db = Db::new(store.clone());

    rt.block_on(async {
        let mut users = Vec::with_capacity(USERS);
        for n in 0..USERS {
            let user = db
                .create_user(NewUser {
                    username: format!("user{n}"),
                    email: format!("user{n}@example.com"),
                    fullname: format!("User {n}"),
                    password_hash: "hash".to_string(),
                    avatar: "https://cdn.example.com/a.png".to_string(),
                    cover_image: String::new(),
                })
                .await
                .expect("Failed to seed user");
            users.push(user.id);
        }

        let mut videos = Vec::new();
        for (n, owner) in users.iter().enumerate() {
            for v in 0..VIDEOS_PER_USER {
                let created = format!("2026-01-01T00:00:{:02}.{:03}Z", v, n);
                let video = Video {
                    id: new_object_id(),
                    video_file: "https://cdn.example.com/v.mp4".to_string(),
                    thumbnail: "https://cdn.example.com/t.png".to_string(),
                    title: format!("Video {v} by user{n}"),
                    description: "Benchmark fixture".to_string(),
                    duration: 60.0,
                    views: (n * v) as i64,
                    is_published: v % 4 != 0,
                    owner: owner.clone(),
                    created_at: created.clone(),
                    updated_at: created,
                };
                videos.push(db.create_video(&video).await.expect("Failed to seed video").id);
            }
        }

        let star = &users[0];
        for (n, user) in users.iter().enumerate().skip(1) {
            db.toggle_subscription(user, star).await.expect("Failed to subscribe");
            db.toggle_like(user, LikeTarget::Video, &videos[n % videos.len()])
                .await
                .expect("Failed to like");
        }
        for video in videos.iter().step_by(7).take(50) {
            db.add_to_watch_history(star, video)
                .await
                .expect("Failed to record history");
        }

        (store.clone(), star.clone())
    })
}

fn benchmark_read_models(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to build runtime");
    let (store, star) = seed(&rt);

    let users = rt
        .block_on(store.find(collections::USERS, &Filter::All, &[]))
        .expect("Failed to load users");
    let videos = rt
        .block_on(store.find(collections::VIDEOS, &Filter::All, &[]))
        .expect("Failed to load videos");

    let profile = read_model::channel_profile_pipeline(&star, "user0");
    let history = read_model::watch_history_pipeline(&star);
    let listing = read_model::list_videos_pipeline(
        &star,
        &VideoListParams {
            search: Some("user1".to_string()),
            ..VideoListParams::default()
        },
    );
    let stats = read_model::channel_stats_pipeline(&star);

    let mut group = c.benchmark_group("memory_pipelines");

    group.bench_function("channel_profile", |b| {
        b.iter(|| store.run_pipeline(black_box(users.clone()), black_box(&profile)))
    });

    group.bench_function("watch_history", |b| {
        b.iter(|| store.run_pipeline(black_box(users.clone()), black_box(&history)))
    });

    group.bench_function("list_videos_search", |b| {
        b.iter(|| store.run_pipeline(black_box(videos.clone()), black_box(&listing)))
    });

    group.bench_function("channel_stats", |b| {
        b.iter(|| store.run_pipeline(black_box(users.clone()), black_box(&stats)))
    });

    group.finish();
}

criterion_group!(benches, benchmark_read_models);
criterion_main!(benches);
