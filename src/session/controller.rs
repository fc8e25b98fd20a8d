//! Session controller - the turn state machine
//!
//! Drives one turn from the board drop to the deferred board effect:
//!
//! ```text
//! Idle --drop--> PlayerMoved --free play--------------------------> Idle
//!                            --Continue--> AutoReplying --200ms--> Idle
//!                            --Incorrect-> Reverting   --600ms--> Idle
//!                            --End-------> Ending      --1000ms-> Idle
//!                            --lookup error (logged)-------------> Idle
//! ```
//!
//! State-container updates are issued eagerly; board mutations wait for their
//! delay so the player sees a move-and-reply rhythm. A drop is refused while
//! the previous turn is still resolving or its effect is still pending.
//!
//! Every turn carries the scheduler generation it started in. Phase changes,
//! cursor dispatches and scheduled effects are only applied while that
//! generation is current, checked under the board lock, so a reset that
//! lands while a lookup is in flight wins over the turn it interrupted.
//! Store observers run under that lock and must not call back into the
//! controller.
//!
//! # Integration
//!
//! The board widget calls [`SessionController::on_piece_drop`], which applies
//! the move synchronously and finishes the turn on a spawned task. Callers that
//! want the outcome (the CLI, tests) use [`SessionController::drop_piece`].

use super::scheduler::EffectScheduler;
use crate::board::{parse_square, Board, BoardView, MoveAttempt, Orientation, PlayedMove};
use crate::core::TurnDelays;
use crate::learn::{LearnOutcome, LearningResolver};
use crate::state::{Action, MoveRecorder, SessionStore, TrainerMode};
use crate::tree::{MoveNode, SharedStore, TreeLookup};
use parking_lot::Mutex;
use shakmaty::Role;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Phase of the current turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TurnPhase {
    /// Waiting for the player to drop a piece
    #[default]
    Idle,
    /// Move applied to the board, resolution in flight
    PlayerMoved,
    /// Book reply scheduled
    AutoReplying,
    /// Take-back scheduled
    Reverting,
    /// Board reset scheduled
    Ending,
}

impl TurnPhase {
    pub fn accepts_input(&self) -> bool {
        matches!(self, TurnPhase::Idle)
    }
}

/// What became of a drop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Illegal move, bad square, or a turn still in progress
    Rejected,
    /// Free play: the move was recorded, `known` when it is a book move
    Recorded { san: String, known: bool },
    /// Correct move; `reply` will be played after the reply delay
    Continue { san: String, reply: String },
    /// Wrong move; it will be taken back after the revert delay
    Incorrect { san: String },
    /// Line exhausted; the board resets after the reset delay
    End { san: String },
    /// The lookup failed; the move stays on the board and nothing else changes
    Aborted { san: String },
}

/// Collaborators a controller is built from
pub struct SessionContext {
    /// Arena the recorder appends provisional nodes to
    pub tree: SharedStore,
    pub lookup: Arc<dyn TreeLookup>,
    pub store: Arc<SessionStore>,
    pub view: Arc<dyn BoardView>,
    pub delays: TurnDelays,
}

struct Inner {
    board: Mutex<Board>,
    phase: Mutex<TurnPhase>,
    /// Set from an accepted drop until its turn has finished resolving
    resolving: AtomicBool,
    store: Arc<SessionStore>,
    view: Arc<dyn BoardView>,
    recorder: MoveRecorder,
    resolver: LearningResolver,
    scheduler: EffectScheduler,
    delays: TurnDelays,
}

/// A drop that passed the rules engine and awaits resolution
struct StartedTurn {
    played: PlayedMove,
    cursor: MoveNode,
    generation: u64,
}

/// Clears the resolving flag when a turn finishes, however it exits
struct ResolvingGuard<'a>(&'a AtomicBool);

impl Drop for ResolvingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle to a trainer session; clones share the session
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    pub fn new(ctx: SessionContext) -> Self {
        let recorder = MoveRecorder::new(
            Arc::clone(&ctx.lookup),
            Arc::clone(&ctx.tree),
            Arc::clone(&ctx.store),
        );
        let resolver = LearningResolver::new(Arc::clone(&ctx.lookup));

        let controller = Self {
            inner: Arc::new(Inner {
                board: Mutex::new(Board::new()),
                phase: Mutex::new(TurnPhase::Idle),
                resolving: AtomicBool::new(false),
                store: ctx.store,
                view: ctx.view,
                recorder,
                resolver,
                scheduler: EffectScheduler::new(),
                delays: ctx.delays,
            }),
        };
        controller.render();
        controller
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.inner.store
    }

    pub fn phase(&self) -> TurnPhase {
        *self.inner.phase.lock()
    }

    pub fn fen(&self) -> String {
        self.inner.board.lock().fen()
    }

    pub fn generation(&self) -> u64 {
        self.inner.scheduler.generation()
    }

    /// `true` when the next drop would be considered
    pub fn is_idle(&self) -> bool {
        self.phase().accepts_input()
            && self.inner.scheduler.is_idle()
            && !self.inner.resolving.load(Ordering::SeqCst)
    }

    /// Board widget entry point
    ///
    /// Returns whether the widget should keep the piece where it was dropped.
    /// The rest of the turn runs on a spawned task, so this must be called
    /// from within a tokio runtime.
    pub fn on_piece_drop(&self, from: &str, to: &str) -> bool {
        let Some(turn) = self.begin_turn(from, to) else {
            return false;
        };

        let this = self.clone();
        tokio::spawn(async move {
            this.finish_turn(turn).await;
        });
        true
    }

    /// Apply a drop and resolve it, returning the outcome
    ///
    /// Deferred board effects are still pending when this returns; see
    /// [`SessionController::wait_idle`].
    pub async fn drop_piece(&self, from: &str, to: &str) -> TurnOutcome {
        match self.begin_turn(from, to) {
            Some(turn) => self.finish_turn(turn).await,
            None => TurnOutcome::Rejected,
        }
    }

    /// Wait for the pending board effect, if any
    pub async fn wait_idle(&self) {
        self.inner.scheduler.wait_idle().await;
    }

    /// Abandon the current line: cancel pending effects, reset board and cursor
    pub fn reset_session(&self) {
        {
            let mut board = self.inner.board.lock();
            let generation = self.inner.scheduler.cancel_all();
            board.reset();
            *self.inner.phase.lock() = TurnPhase::Idle;
            self.inner.store.dispatch(Action::Reset);
            info!("[SESSION] Session reset (generation {})", generation);
        }
        self.render();
    }

    /// Switch mode; the current line is abandoned
    pub fn set_mode(&self, mode: TrainerMode) {
        self.inner.store.dispatch(Action::SetMode(mode));
        self.reset_session();
    }

    /// Flip the board; the line and any pending effect are kept
    pub fn set_orientation(&self, orientation: Orientation) {
        self.inner.store.dispatch(Action::SetOrientation(orientation));
        self.render();
    }

    fn render(&self) {
        let fen = self.fen();
        self.inner.view.render(&fen, self.inner.store.orientation());
    }

    fn begin_turn(&self, from: &str, to: &str) -> Option<StartedTurn> {
        let (from_sq, to_sq) = match (parse_square(from), parse_square(to)) {
            (Ok(f), Ok(t)) => (f, t),
            (Err(e), _) | (_, Err(e)) => {
                warn!("[SESSION] Rejected drop {} -> {}: {}", from, to, e);
                return None;
            }
        };

        // Lock order is board, then phase
        let turn = {
            let mut board = self.inner.board.lock();
            let mut phase = self.inner.phase.lock();
            if !phase.accepts_input()
                || !self.inner.scheduler.is_idle()
                || self.inner.resolving.load(Ordering::SeqCst)
            {
                debug!(
                    "[SESSION] Rejected drop {} -> {}: turn in progress ({:?})",
                    from, to, *phase
                );
                return None;
            }

            match board.apply_move(from_sq, to_sq, Role::Queen) {
                MoveAttempt::Applied(played) => {
                    *phase = TurnPhase::PlayerMoved;
                    self.inner.resolving.store(true, Ordering::SeqCst);
                    StartedTurn {
                        played,
                        cursor: self.inner.store.cursor(),
                        generation: self.inner.scheduler.generation(),
                    }
                }
                MoveAttempt::Illegal => {
                    debug!("[SESSION] Illegal drop {} -> {}", from, to);
                    return None;
                }
            }
        };

        self.render();
        Some(turn)
    }

    async fn finish_turn(&self, turn: StartedTurn) -> TurnOutcome {
        let _resolving = ResolvingGuard(&self.inner.resolving);
        let StartedTurn {
            played,
            cursor,
            generation,
        } = turn;

        if self.inner.store.mode() != TrainerMode::Learn {
            return self.finish_free_play(played, cursor, generation).await;
        }

        let outcome = match self.inner.resolver.resolve(&played.san, &cursor).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    "[SESSION] Malformed resolution for {} at {}: {}. Turn aborted.",
                    played.san, cursor.key, e
                );
                self.set_phase(generation, TurnPhase::Idle);
                return TurnOutcome::Aborted { san: played.san };
            }
        };

        match outcome {
            LearnOutcome::Continue {
                matched,
                auto_reply,
            } => {
                if !self.set_phase(generation, TurnPhase::AutoReplying) {
                    return self.stale(played.san);
                }
                info!("[SESSION] {} is book, replying {}", played.san, auto_reply.san);
                self.schedule_reply(generation, auto_reply.san.clone());

                // The reply is recorded as a child of the player's move
                let first = match self
                    .inner
                    .recorder
                    .locate_move(&played.san, &played.piece, &cursor)
                    .await
                {
                    Ok(first) => first,
                    Err(e) => {
                        error!("[SESSION] Failed to record {}: {}", played.san, e);
                        return TurnOutcome::Continue {
                            san: played.san,
                            reply: auto_reply.san,
                        };
                    }
                };
                if !self.commit(generation, first.node.clone()) {
                    return self.stale(played.san);
                }
                if !first.known {
                    warn!(
                        "[SESSION] {} resolved as {} but was not found when recorded",
                        played.san, matched.key
                    );
                    return TurnOutcome::Continue {
                        san: played.san,
                        reply: auto_reply.san,
                    };
                }

                match self
                    .inner
                    .recorder
                    .locate_move(&auto_reply.san, &auto_reply.piece, &first.node)
                    .await
                {
                    Ok(reply) => {
                        if !self.commit(generation, reply.node) {
                            return self.stale(played.san);
                        }
                    }
                    Err(e) => error!("[SESSION] Failed to record reply {}: {}", auto_reply.san, e),
                }

                TurnOutcome::Continue {
                    san: played.san,
                    reply: auto_reply.san,
                }
            }
            LearnOutcome::Incorrect => {
                if !self.set_phase(generation, TurnPhase::Reverting) {
                    return self.stale(played.san);
                }
                info!("[SESSION] {} is not in the book, taking it back", played.san);
                self.schedule_revert(generation);
                TurnOutcome::Incorrect { san: played.san }
            }
            LearnOutcome::End => {
                if !self.set_phase(generation, TurnPhase::Ending) {
                    return self.stale(played.san);
                }
                info!("[SESSION] Line finished after {}", played.san);
                let next = self.inner.scheduler.cancel_all();
                self.inner.store.dispatch(Action::Reset);
                self.schedule_board_reset(next);
                TurnOutcome::End { san: played.san }
            }
        }
    }

    async fn finish_free_play(
        &self,
        played: PlayedMove,
        cursor: MoveNode,
        generation: u64,
    ) -> TurnOutcome {
        let located = self
            .inner
            .recorder
            .locate_move(&played.san, &played.piece, &cursor)
            .await;

        let known = match located {
            Ok(recorded) => {
                if !self.commit(generation, recorded.node) {
                    return self.stale(played.san);
                }
                recorded.known
            }
            Err(e) => {
                error!("[SESSION] Failed to record {}: {}", played.san, e);
                false
            }
        };

        if !self.set_phase(generation, TurnPhase::Idle) {
            return self.stale(played.san);
        }
        TurnOutcome::Recorded {
            san: played.san,
            known,
        }
    }

    fn stale(&self, san: String) -> TurnOutcome {
        debug!("[SESSION] Session reset while {} was resolving", san);
        TurnOutcome::Aborted { san }
    }

    /// Run `update` under the board lock if `generation` is still current
    ///
    /// Lock order is board, then phase, matching [`SessionController::reset_session`].
    fn if_current<R>(
        &self,
        generation: u64,
        update: impl FnOnce(&mut Board, &mut TurnPhase) -> R,
    ) -> Option<R> {
        let mut board = self.inner.board.lock();
        if !self.inner.scheduler.is_current(generation) {
            return None;
        }
        let mut phase = self.inner.phase.lock();
        Some(update(&mut board, &mut phase))
    }

    fn set_phase(&self, generation: u64, next: TurnPhase) -> bool {
        self.if_current(generation, |_, phase| *phase = next).is_some()
    }

    /// Move the cursor onto `node` unless the session was reset meanwhile
    fn commit(&self, generation: u64, node: MoveNode) -> bool {
        let store = &self.inner.store;
        self.if_current(generation, |_, _| store.dispatch(Action::MakeMove(node)))
            .is_some()
    }

    /// Run `apply` on the board if `generation` is still current, then go idle
    fn board_effect<F>(&self, generation: u64, apply: F)
    where
        F: FnOnce(&mut Board),
    {
        let applied = self.if_current(generation, |board, phase| {
            apply(board);
            *phase = TurnPhase::Idle;
        });
        if applied.is_some() {
            self.render();
        }
    }

    fn schedule_reply(&self, generation: u64, san: String) {
        let this = self.clone();
        self.inner
            .scheduler
            .schedule_for(generation, self.inner.delays.reply(), move |generation| {
                this.board_effect(generation, |board| {
                    if let Err(e) = board.play_san(&san) {
                        error!("[SESSION] Book reply {} is not playable: {}", san, e);
                    }
                });
            });
    }

    fn schedule_revert(&self, generation: u64) {
        let this = self.clone();
        self.inner
            .scheduler
            .schedule_for(generation, self.inner.delays.revert(), move |generation| {
                this.board_effect(generation, |board| {
                    board.undo();
                });
            });
    }

    fn schedule_board_reset(&self, generation: u64) {
        let this = self.clone();
        self.inner
            .scheduler
            .schedule_for(generation, self.inner.delays.reset(), move |generation| {
                this.board_effect(generation, Board::reset);
            });
    }
}
