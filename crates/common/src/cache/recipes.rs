//! Ready-made memoized functions

use super::core::Memoized;
use super::recursive::RecursiveMemo;
use super::{memoize, memoize_recursive};

/// Memoized Fibonacci over `u32` indices
///
/// Values past index 93 do not fit in a `u64` and saturate at `u64::MAX`.
pub fn fibonacci() -> RecursiveMemo<u32, u64, impl Fn(&dyn Fn(&u32) -> u64, &u32) -> u64> {
    memoize_recursive(|fib: &dyn Fn(&u32) -> u64, n: &u32| {
        if *n <= 1 {
            u64::from(*n)
        } else {
            fib(&(n - 1)).saturating_add(fib(&(n - 2)))
        }
    })
}

/// Memoized whitespace token count
pub fn token_count() -> Memoized<String, usize, impl Fn(&String) -> usize> {
    memoize(|text: &String| text.split_whitespace().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibonacci_values() {
        let fib = fibonacci();
        assert_eq!(fib.call(&0), 0);
        assert_eq!(fib.call(&1), 1);
        assert_eq!(fib.call(&10), 55);
        assert_eq!(fib.call(&90), 2_880_067_194_370_816_120);
        assert_eq!(fib.call(&200), u64::MAX);
    }

    #[test]
    fn test_token_count_is_cached() {
        let count = token_count();
        let text = "Functional programming favors pure functions and immutability".to_string();

        assert_eq!(count.call(&text), 7);
        assert_eq!(count.call(&text), 7);
        assert_eq!(count.call(&"   ".to_string()), 0);
        assert_eq!(count.call(&"\t  leading and\n trailing  ".to_string()), 3);

        let stats = count.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.computations, 3);
    }
}
