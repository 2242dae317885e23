//! Round-robin load balancing strategy.

use crate::load_balancer::LoadBalancer;

/// Round-robin selector.
/// Stores a cursor into the available subset to rotate through servers.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: usize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl LoadBalancer for RoundRobin {
    fn next_index(&mut self, available: usize) -> Option<usize> {
        if available == 0 {
            return None;
        }

        let index = self.cursor % available;
        self.cursor = (index + 1) % available;
        Some(index)
    }

    // Keep the cursor on the same upcoming server when the subset shifts under it.
    fn on_removed(&mut self, position: usize) {
        if position < self.cursor {
            self.cursor -= 1;
        }
    }

    fn on_restored(&mut self, position: usize) {
        if position < self.cursor {
            self.cursor += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let mut lb = RoundRobin::new();

        assert_eq!(lb.next_index(2), Some(0));
        assert_eq!(lb.next_index(2), Some(1));
        assert_eq!(lb.next_index(2), Some(0));
    }

    #[test]
    fn test_empty_subset() {
        let mut lb = RoundRobin::new();
        assert_eq!(lb.next_index(0), None);
        assert_eq!(lb.cursor(), 0);
    }

    #[test]
    fn test_fairness_for_all_sizes() {
        for n in 1..=16 {
            let mut lb = RoundRobin::new();
            // Start from an arbitrary offset.
            for _ in 0..(n / 2) {
                lb.next_index(n);
            }

            let mut seen = vec![0usize; n];
            for _ in 0..n {
                seen[lb.next_index(n).unwrap()] += 1;
            }
            assert!(seen.iter().all(|&count| count == 1), "n={} seen={:?}", n, seen);
        }
    }

    #[test]
    fn test_removal_before_cursor_keeps_next_server() {
        let mut lb = RoundRobin::new();
        // [A, B, C]: A then B selected, cursor now designates C.
        lb.next_index(3);
        assert_eq!(lb.next_index(3), Some(1));

        // B (position 1) leaves; C moves to position 1.
        lb.on_removed(1);
        assert_eq!(lb.next_index(2), Some(1));
    }

    #[test]
    fn test_removal_after_cursor_is_ignored() {
        let mut lb = RoundRobin::new();
        lb.next_index(3);
        lb.on_removed(2);
        assert_eq!(lb.next_index(2), Some(1));
    }

    #[test]
    fn test_restore_before_cursor() {
        let mut lb = RoundRobin::new();
        // [A, C]: A selected, cursor designates C at position 1.
        lb.next_index(2);
        // B re-enters at the cursor position and becomes the next pick.
        lb.on_restored(1);
        assert_eq!(lb.cursor(), 1);
        // A server re-entering ahead of the cursor pushes it forward.
        lb.on_restored(0);
        assert_eq!(lb.cursor(), 2);
        assert_eq!(lb.next_index(4), Some(2));
    }
}
