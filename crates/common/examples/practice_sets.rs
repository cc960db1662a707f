//! Example: memoization, retry, circuit breaking and validation together
//!
//! Run with: `cargo run -p steadfast-common --example practice_sets
//! --features test-utils`
//!
//! Set `RUST_LOG=debug` to see the retry and breaker decisions as they
//! happen.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use steadfast_common::cache::{memoize, memoize_with_ttl, recipes};
use steadfast_common::resilience::{retry, CircuitBreaker, ResilienceError};
use steadfast_common::testing::{FlakyError, FlakyService};
use steadfast_common::validation::Validator;

#[derive(Debug)]
struct User {
    name: String,
    email: String,
    age: u32,
    password: String,
}

fn exponential(attempt: u32) -> Duration {
    Duration::from_millis(100 * 2u64.pow(attempt.saturating_sub(1)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("Memoization");
    println!("===========\n");

    let square = memoize(|n: &u64| {
        println!("  computing {n}^2");
        n * n
    });
    println!("  square(12) = {}", square.call(&12));
    println!("  square(12) = {} (cached)", square.call(&12));

    let slow_square = memoize_with_ttl(
        |n: &u64| {
            println!("  computing {n}^2 (ttl)");
            n * n
        },
        Duration::from_millis(100),
    );
    slow_square.call(&7);
    tokio::time::sleep(Duration::from_millis(50)).await;
    slow_square.call(&7);
    tokio::time::sleep(Duration::from_millis(100)).await;
    slow_square.call(&7);
    println!("  ttl stats: {:?}", slow_square.stats());

    let fib = recipes::fibonacci();
    println!("  fib(90) = {}", fib.call(&90));
    println!("  memoized {} fibonacci values\n", fib.len());

    let tokens = recipes::token_count();
    let prompt = "memoize the expensive calls".to_string();
    println!("  tokens = {}, again = {}", tokens.call(&prompt), tokens.call(&prompt));

    println!("\nRetry");
    println!("=====\n");

    let service = FlakyService::new(2);
    let outcome = retry(
        || {
            let service = service.clone();
            async move { service.call("payload") }
        },
        5,
        exponential,
        |_: &FlakyError| true,
        StdRng::seed_from_u64(42),
    )
    .await;
    println!(
        "  {:?} after {} attempts, waited {:?}",
        outcome.result, outcome.attempts, outcome.total_delay
    );

    println!("\nCircuit breaker");
    println!("===============\n");

    let breaker = CircuitBreaker::with_threshold(2, Duration::from_millis(300))?;
    let service = FlakyService::new(3);
    for i in 1..=3 {
        let result = breaker.call(|| service.call("payload"));
        println!("  call {i}: {result:?} -> {}", breaker.state());
    }
    tokio::time::sleep(Duration::from_millis(350)).await;
    println!("  after cool-down: {}", breaker.state());
    let result = breaker.call(|| service.call("payload"));
    println!("  trial call: {result:?} -> {}", breaker.state());

    println!("\nRetry around a breaker");
    println!("======================\n");

    let breaker = CircuitBreaker::with_threshold(3, Duration::from_millis(200))?;
    let service = FlakyService::new(4);
    let outcome = retry(
        || {
            let breaker = breaker.clone();
            let service = service.clone();
            async move { breaker.execute(|| async move { service.call("payload") }).await }
        },
        6,
        exponential,
        |_: &ResilienceError<FlakyError>| true,
        StdRng::seed_from_u64(42),
    )
    .await;
    println!(
        "  {:?} after {} attempts, breaker {:?}",
        outcome.result,
        outcome.attempts,
        breaker.metrics()
    );

    println!("\nValidation");
    println!("==========\n");

    let name = Validator::lift(|s: &str| !s.trim().is_empty(), "name must not be blank");
    let age = Validator::lift(|a: &u32| (18..=120).contains(a), "age must be between 18 and 120");
    let corporate = Validator::lift(|s: &str| s.ends_with("@acme.com"), "not a corporate address");
    let gmail = Validator::lift(|s: &str| s.ends_with("@gmail.com"), "not a gmail address");
    let email = Validator::email("invalid email");
    let strong = Validator::lift(
        |p: &str| p.len() >= 8 && p.chars().any(|c| c.is_ascii_digit()),
        "weak password",
    );
    let user = name
        .compose(|u: &User| u.name.as_str())
        .and(email.and(corporate.or(gmail)).compose(|u: &User| u.email.as_str()))
        .and(age.compose(|u: &User| &u.age))
        .and(strong.compose(|u: &User| u.password.as_str()));

    let candidates = [
        User {
            name: "Alice".into(),
            email: "alice@acme.com".into(),
            age: 30,
            password: "s3cretpass".into(),
        },
        User { name: "Bob".into(), email: "bob@yahoo.com".into(), age: 25, password: "s3cretpass".into() },
        User { name: "Cara".into(), email: "cara@gmail.com".into(), age: 16, password: "short".into() },
        User { name: "Dan".into(), email: "dan@@acme.com".into(), age: 40, password: "s3cretpass".into() },
    ];
    for candidate in &candidates {
        println!("  {}: {}", candidate.name, user.validate(candidate));
    }

    Ok(())
}
