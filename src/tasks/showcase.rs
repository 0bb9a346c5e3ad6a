use std::sync::Arc;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::config::ShowcaseOptions;
use crate::events::{AccentChanged, SelectCar, ShowcaseState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Swap,
    Settle,
}

/// The carousel state machine.
///
/// Selections are accepted only while idle; a selection arriving during a
/// transition is dropped, not queued. The two phases after acceptance are
/// driven externally: [`Carousel::finish_swap`] moves the displayed entry to
/// the active one, [`Carousel::finish_settle`] re-enables selection.
#[derive(Debug)]
pub struct Carousel {
    len: usize,
    state: ShowcaseState,
    phase: Phase,
}

impl Carousel {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            state: ShowcaseState::initial(),
            phase: Phase::Idle,
        }
    }

    pub fn state(&self) -> ShowcaseState {
        self.state
    }

    /// Accept a selection, returning `true` when a transition started.
    ///
    /// Out-of-range indices, re-selecting the active entry, and selections
    /// made mid-transition all leave the state untouched.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.len || index == self.state.active_index || self.state.transitioning {
            return false;
        }
        self.state.transitioning = true;
        self.state.active_index = index;
        self.phase = Phase::Swap;
        true
    }

    /// First phase done: the detail panel now shows the active entry.
    pub fn finish_swap(&mut self) {
        if self.phase == Phase::Swap {
            self.state.displayed_index = self.state.active_index;
            self.phase = Phase::Settle;
        }
    }

    /// Second phase done: selections are accepted again.
    pub fn finish_settle(&mut self) {
        if self.phase == Phase::Settle {
            self.state.transitioning = false;
            self.phase = Phase::Idle;
        }
    }

    fn in_swap(&self) -> bool {
        self.phase == Phase::Swap
    }
}

/// Drives the carousel from select commands.
///
/// On an accepted selection the accent change is announced immediately, the
/// detail swap happens after `swap_delay`, and selection re-enables after a
/// further `settle_delay`. Every state change is published on `state_tx`.
/// Cancellation aborts a pending phase without touching the state again.
pub async fn run(
    catalog: Arc<Catalog>,
    mut select_rx: Receiver<SelectCar>,
    accent_tx: Sender<AccentChanged>,
    state_tx: watch::Sender<ShowcaseState>,
    options: ShowcaseOptions,
    cancel: CancellationToken,
) -> Result<()> {
    let mut carousel = Carousel::new(catalog.len());
    let mut deadline: Option<Instant> = None;

    loop {
        select! {
            _ = cancel.cancelled() => break,

            maybe_select = select_rx.recv() => {
                match maybe_select {
                    Some(SelectCar(index)) => {
                        let Some(item) = catalog.get(index) else {
                            warn!(index, "select out of range, ignoring");
                            continue;
                        };
                        if carousel.select(index) {
                            debug!(index, car = %item.id, "transition started");
                            if accent_tx
                                .send(AccentChanged {
                                    index,
                                    accent_color: item.accent_color.clone(),
                                })
                                .await
                                .is_err()
                            {
                                debug!("accent listener gone");
                            }
                            deadline = Some(Instant::now() + options.swap_delay);
                            let _ = state_tx.send(carousel.state());
                        } else {
                            debug!(index, "selection dropped");
                        }
                    }
                    None => break,
                }
            }

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if carousel.in_swap() {
                    carousel.finish_swap();
                    deadline = Some(Instant::now() + options.settle_delay);
                } else {
                    carousel.finish_settle();
                    deadline = None;
                }
                let _ = state_tx.send(carousel.state());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reselecting_the_active_entry_is_a_no_op() {
        let mut carousel = Carousel::new(3);
        let before = carousel.state();
        assert!(!carousel.select(0));
        assert_eq!(carousel.state(), before);
    }

    #[test]
    fn out_of_range_selection_is_rejected() {
        let mut carousel = Carousel::new(3);
        assert!(!carousel.select(3));
        assert_eq!(carousel.state(), ShowcaseState::initial());
    }

    #[test]
    fn accepted_selection_runs_both_phases() {
        let mut carousel = Carousel::new(3);
        assert!(carousel.select(2));

        let state = carousel.state();
        assert_eq!(state.active_index, 2);
        assert_eq!(state.displayed_index, 0, "detail panel lags the selection");
        assert!(state.transitioning);

        carousel.finish_swap();
        assert_eq!(carousel.state().displayed_index, 2);
        assert!(carousel.state().transitioning);

        carousel.finish_settle();
        assert!(!carousel.state().transitioning);
    }

    #[test]
    fn selection_during_transition_is_dropped_not_queued() {
        let mut carousel = Carousel::new(3);
        assert!(carousel.select(1));
        let mid = carousel.state();

        assert!(!carousel.select(2));
        assert_eq!(carousel.state(), mid);

        carousel.finish_swap();
        carousel.finish_settle();
        assert_eq!(carousel.state().active_index, 1);
        assert_eq!(carousel.state().displayed_index, 1);
    }

    #[test]
    fn phase_completions_out_of_order_do_nothing() {
        let mut carousel = Carousel::new(2);
        carousel.finish_swap();
        carousel.finish_settle();
        assert_eq!(carousel.state(), ShowcaseState::initial());

        assert!(carousel.select(1));
        carousel.finish_settle();
        assert!(carousel.state().transitioning, "settle cannot skip the swap");
    }
}
