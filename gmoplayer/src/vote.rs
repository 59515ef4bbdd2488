//! Vote de quorum autorisant un skip demandé par un utilisateur non privilégié

use crate::display::{DisplayContent, DisplaySurface, VoteModel, VotePolarity, VoteReaction};
use crate::model::{GuildId, MessageId, UserId};
use crate::Result;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Quorum threshold for a channel with `eligible_members` non-automated
/// members: everyone for tiny channels, a majority above that.
///
/// `n <= 2` -> `n`, otherwise `ceil(n / 2)`.
pub fn skip_threshold(eligible_members: usize) -> usize {
    if eligible_members <= 2 {
        eligible_members
    } else {
        eligible_members.div_ceil(2)
    }
}

/// Ballot state of one skip contest.
///
/// Invariant: an identity appears in at most one of the two sets. Casting
/// the opposite polarity moves the identity, it never accumulates.
#[derive(Debug)]
pub struct SkipVote {
    upvotes: HashSet<UserId>,
    downvotes: HashSet<UserId>,
    threshold: usize,
}

impl SkipVote {
    pub fn new(threshold: usize) -> Self {
        Self {
            upvotes: HashSet::new(),
            downvotes: HashSet::new(),
            threshold,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Net count: `|upvotes| - |downvotes|`.
    pub fn count(&self) -> i64 {
        self.upvotes.len() as i64 - self.downvotes.len() as i64
    }

    /// Whether the net count has reached the threshold.
    pub fn decided(&self) -> bool {
        self.count() >= self.threshold as i64
    }

    /// Apply one vote change.
    ///
    /// Adding a polarity removes the identity's previous opposite vote;
    /// retracting only removes the identity from that polarity's set.
    pub fn cast(&mut self, actor: UserId, polarity: VotePolarity, added: bool) {
        match (polarity, added) {
            (VotePolarity::Up, true) => {
                self.downvotes.remove(&actor);
                self.upvotes.insert(actor);
            }
            (VotePolarity::Up, false) => {
                self.upvotes.remove(&actor);
            }
            (VotePolarity::Down, true) => {
                self.upvotes.remove(&actor);
                self.downvotes.insert(actor);
            }
            (VotePolarity::Down, false) => {
                self.downvotes.remove(&actor);
            }
        }
    }
}

/// A live skip vote: tally display plus a fixed decision window.
///
/// Built by the session manager when a non-privileged user asks for a skip.
/// Eligibility is the audio channel membership snapshot at open time, plus
/// the process owner as a moderation override.
pub struct SkipVotePrompt {
    surface: Arc<dyn DisplaySurface>,
    guild: GuildId,
    prompt: String,
    window: Duration,
    eligible: HashSet<UserId>,
    override_voter: UserId,
    vote: SkipVote,
    message: Option<MessageId>,
}

impl SkipVotePrompt {
    /// Build a vote over the given eligible identities.
    ///
    /// The threshold is computed from `eligible.len()`; a vote opened with
    /// zero eligible members has a threshold of zero and decides true
    /// immediately once the requester's vote is cast.
    pub fn new(
        surface: Arc<dyn DisplaySurface>,
        guild: GuildId,
        prompt: impl Into<String>,
        window: Duration,
        eligible: HashSet<UserId>,
        override_voter: UserId,
    ) -> Self {
        let threshold = skip_threshold(eligible.len());
        Self {
            surface,
            guild,
            prompt: prompt.into(),
            window,
            eligible,
            override_voter,
            vote: SkipVote::new(threshold),
            message: None,
        }
    }

    /// Count the requester's own upvote before the window opens.
    pub fn cast_initial(&mut self, requester: UserId) {
        self.vote.cast(requester, VotePolarity::Up, true);
    }

    /// Whether the vote is already decided (no window needed).
    pub fn decided(&self) -> bool {
        self.vote.decided()
    }

    pub fn threshold(&self) -> usize {
        self.vote.threshold()
    }

    fn model(&self) -> VoteModel {
        VoteModel {
            prompt: self.prompt.clone(),
            count: self.vote.count(),
            threshold: self.vote.threshold(),
            window_secs: self.window.as_secs(),
        }
    }

    /// Publish the tally message. Returns its id so the caller can route
    /// inbound reactions to [`SkipVotePrompt::run`].
    pub async fn open(&mut self) -> Result<MessageId> {
        let message = self
            .surface
            .create_message(self.guild, DisplayContent::VoteTally(self.model()))
            .await?;
        self.message = Some(message);
        Ok(message)
    }

    /// Run the decision window.
    ///
    /// Applies every reaction in arrival order, refreshing the tally after
    /// each change, and returns as soon as the threshold is reached (the
    /// pending timer is cancelled) or the window expires. The tally message
    /// is released either way. Exactly one decision is produced.
    pub async fn run(mut self, reactions: &mut mpsc::Receiver<VoteReaction>) -> Result<bool> {
        let deadline = tokio::time::Instant::now() + self.window;
        let mut decision = false;

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    debug!(guild = %self.guild, "Skip vote window expired");
                    break;
                }
                reaction = reactions.recv() => {
                    let Some(reaction) = reaction else { break };
                    if !self.is_eligible(reaction.actor) {
                        continue;
                    }

                    self.vote.cast(reaction.actor, reaction.polarity, reaction.added);

                    if self.vote.decided() {
                        decision = true;
                        break;
                    }

                    self.refresh_tally().await;
                }
            }
        }

        self.close().await;
        Ok(decision)
    }

    fn is_eligible(&self, actor: UserId) -> bool {
        actor == self.override_voter || self.eligible.contains(&actor)
    }

    async fn refresh_tally(&self) {
        let Some(message) = self.message else { return };
        if let Err(e) = self
            .surface
            .edit_message(message, DisplayContent::VoteTally(self.model()))
            .await
        {
            warn!(guild = %self.guild, error = %e, "Failed to refresh vote tally");
        }
    }

    async fn close(&mut self) {
        if let Some(message) = self.message.take() {
            if let Err(e) = self.surface.delete_message(message).await {
                warn!(guild = %self.guild, error = %e, "Failed to release vote message");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_table() {
        // n <= 2 -> n, sinon ceil(n/2)
        assert_eq!(skip_threshold(0), 0);
        assert_eq!(skip_threshold(1), 1);
        assert_eq!(skip_threshold(2), 2);
        assert_eq!(skip_threshold(3), 2);
        assert_eq!(skip_threshold(4), 2);
        assert_eq!(skip_threshold(7), 4);
        assert_eq!(skip_threshold(10), 5);
    }

    #[test]
    fn count_is_upvotes_minus_downvotes() {
        let mut vote = SkipVote::new(3);
        vote.cast(UserId(1), VotePolarity::Up, true);
        vote.cast(UserId(2), VotePolarity::Up, true);
        vote.cast(UserId(3), VotePolarity::Down, true);
        assert_eq!(vote.count(), 1);
        assert!(!vote.decided());
    }

    #[test]
    fn opposite_vote_replaces_the_first() {
        let mut vote = SkipVote::new(2);
        vote.cast(UserId(1), VotePolarity::Up, true);
        assert_eq!(vote.count(), 1);

        // Le second vote de polarité opposée retire le premier
        vote.cast(UserId(1), VotePolarity::Down, true);
        assert_eq!(vote.count(), -1);

        vote.cast(UserId(1), VotePolarity::Up, true);
        assert_eq!(vote.count(), 1);
    }

    #[test]
    fn retracting_a_vote_only_removes_it() {
        let mut vote = SkipVote::new(2);
        vote.cast(UserId(1), VotePolarity::Up, true);
        vote.cast(UserId(2), VotePolarity::Up, true);
        vote.cast(UserId(1), VotePolarity::Up, false);
        assert_eq!(vote.count(), 1);

        // Retirer un vote absent est sans effet
        vote.cast(UserId(3), VotePolarity::Down, false);
        assert_eq!(vote.count(), 1);
    }

    #[test]
    fn threshold_of_zero_decides_immediately() {
        let vote = SkipVote::new(0);
        assert!(vote.decided());
    }

    #[test]
    fn reaching_threshold_decides() {
        let mut vote = SkipVote::new(2);
        vote.cast(UserId(1), VotePolarity::Up, true);
        assert!(!vote.decided());
        vote.cast(UserId(2), VotePolarity::Up, true);
        assert!(vote.decided());
    }
}
