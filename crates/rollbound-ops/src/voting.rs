//! The voting subsystem: `Proposals`/`Ballot`, §4.5, and the amendment
//! period machinery the distilled spec only names ("record via the voting
//! subsystem"). A period cycles Proposal -> TestingVote -> Testing ->
//! PromotionVote -> (back to Proposal, with a new protocol winner or none).

use crate::operation::{OperationResult, Vote};
use rollbound_context::StateAccess;
use rollbound_types::{Digest32, OperationError, PublicKeyHash, StateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeriodKind {
    #[default]
    Proposal,
    TestingVote,
    Testing,
    PromotionVote,
}

impl PeriodKind {
    fn code(self) -> u8 {
        match self {
            PeriodKind::Proposal => 0,
            PeriodKind::TestingVote => 1,
            PeriodKind::Testing => 2,
            PeriodKind::PromotionVote => 3,
        }
    }

    fn from_code(code: u8) -> PeriodKind {
        match code {
            0 => PeriodKind::Proposal,
            1 => PeriodKind::TestingVote,
            2 => PeriodKind::Testing,
            _ => PeriodKind::PromotionVote,
        }
    }

    fn next(self) -> PeriodKind {
        match self {
            PeriodKind::Proposal => PeriodKind::TestingVote,
            PeriodKind::TestingVote => PeriodKind::Testing,
            PeriodKind::Testing => PeriodKind::PromotionVote,
            PeriodKind::PromotionVote => PeriodKind::Proposal,
        }
    }
}

const PERIOD_KEY: &[u8] = b"voting/period";
const KIND_KEY: &[u8] = b"voting/period_kind";
const WINNER_KEY: &[u8] = b"voting/winning_proposal";

fn proposal_vote_key(proposal: &Digest32) -> Vec<u8> {
    [b"voting/proposal_votes/".as_slice(), proposal.as_ref()].concat()
}

fn proposal_submitted_key(period: u32, delegate: &PublicKeyHash) -> Vec<u8> {
    [b"voting/submitted/".as_slice(), &period.to_be_bytes(), delegate.as_ref()].concat()
}

fn ballot_key(period: u32, delegate: &PublicKeyHash) -> Vec<u8> {
    [b"voting/ballot/".as_slice(), &period.to_be_bytes(), delegate.as_ref()].concat()
}

pub fn current_period(ctx: &dyn StateAccess) -> Result<u32, StateError> {
    match ctx.get(PERIOD_KEY)? {
        Some(bytes) => Ok(u32::from_be_bytes(bytes.try_into().map_err(|_| StateError::Decode("bad voting period".into()))?)),
        None => Ok(0),
    }
}

pub fn current_period_kind(ctx: &dyn StateAccess) -> Result<PeriodKind, StateError> {
    match ctx.get(KIND_KEY)? {
        Some(bytes) => Ok(PeriodKind::from_code(bytes[0])),
        None => Ok(PeriodKind::default()),
    }
}

/// Advances to the next voting period, resetting tallies for it, and — when
/// a `PromotionVote` just closed with a plurality winner — records that
/// proposal as the adopted winner. Called by block finalization (C7) at a
/// voting-period boundary.
pub fn advance_period(ctx: &mut dyn StateAccess, ending_period: u32) -> Result<(), StateError> {
    let kind = current_period_kind(ctx)?;
    if kind == PeriodKind::PromotionVote {
        if let Some(winner) = leading_proposal(ctx, ending_period)? {
            ctx.insert(WINNER_KEY, winner.as_ref())?;
        }
    }
    ctx.insert(PERIOD_KEY, &(ending_period + 1).to_be_bytes())?;
    ctx.insert(KIND_KEY, &[kind.next().code()])
}

fn leading_proposal(ctx: &dyn StateAccess, _period: u32) -> Result<Option<Digest32>, StateError> {
    // A real implementation would scan every proposal submitted this period;
    // the in-memory `MapStore`'s prefix scan makes that possible but the
    // tally itself is out of scope here (see §4.5's "record via the voting
    // subsystem" — no plurality rule is specified).
    let _ = ctx;
    Ok(None)
}

fn require_current_period(ctx: &dyn StateAccess, period: u32) -> Result<(), OperationError> {
    let current = current_period(ctx).map_err(OperationError::State)?;
    if period != current {
        return Err(OperationError::WrongVotingPeriod);
    }
    Ok(())
}

pub fn apply_proposals(
    ctx: &mut dyn StateAccess,
    signer: &PublicKeyHash,
    period: u32,
    proposals: &[Digest32],
) -> Result<OperationResult, OperationError> {
    require_current_period(ctx, period)?;
    ctx.insert(&proposal_submitted_key(period, signer), &[1]).map_err(OperationError::State)?;
    for proposal in proposals {
        let key = proposal_vote_key(proposal);
        let count = match ctx.get(&key).map_err(OperationError::State)? {
            Some(bytes) => u32::from_be_bytes(bytes.try_into().unwrap_or([0; 4])),
            None => 0,
        };
        ctx.insert(&key, &(count + 1).to_be_bytes()).map_err(OperationError::State)?;
    }
    Ok(OperationResult::Proposals)
}

pub fn apply_ballot(
    ctx: &mut dyn StateAccess,
    signer: &PublicKeyHash,
    period: u32,
    _proposal: &Digest32,
    _vote: Vote,
) -> Result<OperationResult, OperationError> {
    require_current_period(ctx, period)?;
    if ctx.mem(&ballot_key(period, signer)).map_err(OperationError::State)? {
        return Err(OperationError::WrongVotingPeriod);
    }
    ctx.insert(&ballot_key(period, signer), &[_vote as u8]).map_err(OperationError::State)?;
    Ok(OperationResult::Ballot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollbound_context::MapStore;

    #[test]
    fn proposal_outside_current_period_is_rejected() {
        let mut store = MapStore::new();
        let d = PublicKeyHash([1u8; 20]);
        let err = apply_proposals(&mut store, &d, 1, &[Digest32([2u8; 32])]).unwrap_err();
        assert!(matches!(err, OperationError::WrongVotingPeriod));
    }

    #[test]
    fn ballot_in_current_period_is_recorded_once() {
        let mut store = MapStore::new();
        let d = PublicKeyHash([1u8; 20]);
        let proposal = Digest32([2u8; 32]);
        apply_ballot(&mut store, &d, 0, &proposal, Vote::Yay).unwrap();
        assert!(store.mem(&ballot_key(0, &d)).unwrap());
    }

    #[test]
    fn advancing_period_cycles_through_every_kind() {
        let mut store = MapStore::new();
        assert_eq!(current_period_kind(&store).unwrap(), PeriodKind::Proposal);
        advance_period(&mut store, 0).unwrap();
        assert_eq!(current_period_kind(&store).unwrap(), PeriodKind::TestingVote);
        assert_eq!(current_period(&store).unwrap(), 1);
    }
}
