//! Prints SQL seed data for manual testing: a few users, some posts and
//! nested comment threads. Pipe the output into psql against a database
//! that already ran the migrations.

use rand::Rng;
use uuid::Uuid;

const NUM_USERS: usize = 3;
const NUM_POSTS: usize = 10;
const NUM_COMMENTS: usize = 150;

/// Probability for a comment to reply to an earlier comment of its post
/// instead of starting a new thread.
const REPLY_PROBABILITY: f64 = 0.6;

const TITLE_WORDS: usize = 6;
const DESCRIPTION_WORDS: usize = 40;
const MESSAGE_WORDS: usize = 12;

/// Every seeded account logs in with this password.
const SEED_PASSWORD: &str = "password";

fn gen_n_items(table: &str, n: usize, mut f: impl FnMut(usize) -> String) {
    println!("INSERT INTO {} VALUES", table);
    for i in 0..n {
        if i != 0 {
            println!(",");
        }
        print!("    {}", f(i));
    }
    println!();
    println!("ON CONFLICT DO NOTHING;");
}

fn main() {
    let mut rng = rand::thread_rng();

    // Generate users
    let mut users = Vec::new();
    let password_hash =
        bcrypt::hash(SEED_PASSWORD, bcrypt::DEFAULT_COST).expect("hashing seed password");
    gen_n_items("users", NUM_USERS, |i| {
        let id = Uuid::new_v4();
        users.push(id);
        format!(
            "('{}', 'user{}', 'user{}@example.com', '{}')",
            id, i, i, password_hash
        )
    });

    // Generate posts
    let mut posts = Vec::new();
    gen_n_items("posts", NUM_POSTS, |i| {
        let id = Uuid::new_v4();
        posts.push(id);
        format!(
            "('{}', '{}', '{}', '{}', 'active', NOW() - INTERVAL '{} hours')",
            id,
            users[rng.gen_range(0..users.len())],
            lipsum::lipsum_words(TITLE_WORDS),
            lipsum::lipsum_words(DESCRIPTION_WORDS),
            NUM_POSTS - i
        )
    });

    // Generate comments; a comment only ever replies to an older comment
    // of its own post, which is what creation enforces
    let mut threads: Vec<Vec<Uuid>> = vec![Vec::new(); NUM_POSTS];
    gen_n_items("comments", NUM_COMMENTS, |i| {
        let id = Uuid::new_v4();
        let post_idx = rng.gen_range(0..posts.len());
        let earlier = &threads[post_idx];
        let parent = if !earlier.is_empty() && rng.gen_bool(REPLY_PROBABILITY) {
            format!("'{}'", earlier[rng.gen_range(0..earlier.len())])
        } else {
            String::from("NULL")
        };
        let row = format!(
            "('{}', '{}', '{}', {}, '{}', NOW() - INTERVAL '{} minutes')",
            id,
            posts[post_idx],
            users[rng.gen_range(0..users.len())],
            parent,
            lipsum::lipsum_words(MESSAGE_WORDS),
            NUM_COMMENTS - i
        );
        threads[post_idx].push(id);
        row
    });
}
