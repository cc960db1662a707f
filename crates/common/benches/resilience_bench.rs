//! Memoization and resilience benchmarks
//!
//! Covers the memo hit path, circuit breaker bookkeeping, the retry loop with
//! zero delays, and backoff/jitter calculation.
//!
//! Run with: `cargo bench --bench resilience_bench -p steadfast-common`

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use steadfast_common::cache::{memoize, memoize_with_ttl, recipes};
use steadfast_common::resilience::{
    policies, BackoffStrategy, CircuitBreaker, CircuitBreakerConfig, Jitter, MockClock,
    ResilienceError, RetryConfig, RetryExecutor,
};
use tokio::runtime::Builder as RuntimeBuilder;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct BenchError(&'static str);

// ============================================================================
// Memoization Benchmarks
// ============================================================================

fn bench_memo_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("memo_paths");

    group.bench_function("hit", |b| {
        let square = memoize(|n: &u64| n * n);
        square.call(&42);
        b.iter(|| black_box(square.call(black_box(&42))));
    });

    group.bench_function("hit_with_ttl", |b| {
        let square = memoize_with_ttl(|n: &u64| n * n, Duration::from_secs(3600));
        square.call(&42);
        b.iter(|| black_box(square.call(black_box(&42))));
    });

    group.bench_function("miss", |b| {
        let square = memoize(|n: &u64| n * n);
        let mut key = 0u64;
        b.iter(|| {
            key += 1;
            black_box(square.call(&key))
        });
    });

    for n in [30u32, 90] {
        group.bench_with_input(BenchmarkId::new("fibonacci_cold", n), &n, |b, n| {
            b.iter(|| black_box(recipes::fibonacci().call(n)));
        });
    }

    group.finish();
}

// ============================================================================
// Circuit Breaker Benchmarks
// ============================================================================

fn bench_circuit_breaker(c: &mut Criterion) {
    let mut group = c.benchmark_group("circuit_breaker");

    group.bench_function("call_success", |b| {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::default())
            .expect("default breaker config is valid");
        b.iter(|| {
            let result: Result<_, ResilienceError<BenchError>> = breaker.call(|| Ok(()));
            black_box(result)
        });
    });

    group.bench_function("call_rejected", |b| {
        let breaker = CircuitBreaker::with_clock(
            CircuitBreakerConfig { failure_threshold: 1, cool_down: Duration::from_secs(3600) },
            MockClock::new(),
        )
        .expect("valid breaker config");
        let _ = breaker.call(|| Err::<(), _>(BenchError("open it")));
        b.iter(|| black_box(breaker.call(|| Ok::<_, BenchError>(()))));
    });

    group.bench_function("fail_to_open_and_recover", |b| {
        let clock = MockClock::new();
        let breaker = CircuitBreaker::with_clock(
            CircuitBreakerConfig { failure_threshold: 3, cool_down: Duration::from_millis(10) },
            clock.clone(),
        )
        .expect("valid breaker config");
        b.iter(|| {
            for _ in 0..3 {
                let _ = black_box(breaker.call(|| Err::<(), _>(BenchError("failure"))));
            }
            clock.advance_millis(10);
            black_box(breaker.call(|| Ok::<_, BenchError>(())))
        });
    });

    group.finish();
}

// ============================================================================
// Retry Benchmarks
// ============================================================================

fn bench_retry_executor(c: &mut Criterion) {
    let mut group = c.benchmark_group("retry_executor");
    let runtime = RuntimeBuilder::new_current_thread()
        .enable_time()
        .build()
        .expect("tokio runtime for benchmarks");

    let config = RetryConfig::builder()
        .max_attempts(5)
        .fixed_backoff(Duration::ZERO)
        .no_jitter()
        .build()
        .expect("valid retry config");

    group.bench_function("immediate_success", |b| {
        let executor = RetryExecutor::new(config.clone(), policies::AlwaysRetry);
        b.to_async(&runtime).iter(|| async {
            black_box(executor.execute(|| async { Ok::<_, BenchError>(()) }).await)
        });
    });

    group.bench_function("transient_failures_then_success", |b| {
        let executor = RetryExecutor::new(config.clone(), policies::AlwaysRetry);
        b.to_async(&runtime).iter(|| async {
            let mut remaining_failures = 3u32;
            let outcome = executor
                .execute(move || {
                    let fail_now = remaining_failures > 0;
                    remaining_failures = remaining_failures.saturating_sub(1);
                    async move {
                        if fail_now {
                            Err(BenchError("transient failure"))
                        } else {
                            Ok(())
                        }
                    }
                })
                .await;
            black_box(outcome)
        });
    });

    group.finish();
}

fn bench_backoff_and_jitter(c: &mut Criterion) {
    let mut group = c.benchmark_group("backoff_and_jitter");
    let attempts = [1u32, 5, 10, 30];

    let strategies = [
        ("fixed", BackoffStrategy::Fixed { delay: Duration::from_millis(1) }),
        (
            "linear",
            BackoffStrategy::Linear {
                initial_delay: Duration::from_millis(1),
                increment: Duration::from_millis(5),
            },
        ),
        (
            "exponential",
            BackoffStrategy::Exponential {
                initial_delay: Duration::from_millis(100),
                base: 2.0,
                max_delay: Duration::from_secs(30),
            },
        ),
    ];

    for (name, strategy) in strategies {
        group.bench_with_input(BenchmarkId::new("calculate_delay", name), &strategy, |b, strat| {
            b.iter(|| {
                for attempt in attempts {
                    black_box(strat.calculate_delay(attempt));
                }
            });
        });
    }

    for (name, jitter) in [("none", Jitter::None), ("additive", Jitter::Additive), ("full", Jitter::Full)]
    {
        group.bench_with_input(BenchmarkId::new("jitter", name), &jitter, |b, jitter| {
            let mut rng = StdRng::seed_from_u64(42);
            b.iter(|| black_box(jitter.apply(Duration::from_millis(100), &mut rng)));
        });
    }

    group.finish();
}

criterion_group!(
    resilience,
    bench_memo_paths,
    bench_circuit_breaker,
    bench_retry_executor,
    bench_backoff_and_jitter
);
criterion_main!(resilience);
