//! Diff-and-write helpers shared by the services.
//!
//! Every row write goes together with its audit entry in the same
//! transaction, and bumps `updated_at` where the row has one.

use guestlist_core::Result;
use guestlist_core::audit::{AuditAction, AuditContext, EntityType, NewAuditEntry};
use guestlist_core::providers::RepositoryTx;
use guestlist_core::rsvp::RsvpState;
use guestlist_core::types::{AccompanyingGuest, Guest, Invitation};

pub(crate) async fn write_invitation<T: RepositoryTx>(
    tx: &mut T,
    before: &Invitation,
    after: &mut Invitation,
    action: AuditAction,
    ctx: &AuditContext,
) -> Result<()> {
    after.updated_at = ctx.at;
    tx.update_invitation(after).await?;
    tx.append_audit(&NewAuditEntry::changed(
        EntityType::Invitation,
        *after.id.as_uuid(),
        action,
        before,
        &*after,
        ctx,
    ))
    .await
}

pub(crate) async fn write_guest<T: RepositoryTx>(
    tx: &mut T,
    before: &Guest,
    after: &mut Guest,
    action: AuditAction,
    ctx: &AuditContext,
) -> Result<()> {
    after.updated_at = ctx.at;
    tx.update_guest(after).await?;
    tx.append_audit(&NewAuditEntry::changed(
        EntityType::Guest,
        *after.id.as_uuid(),
        action,
        before,
        &*after,
        ctx,
    ))
    .await
}

pub(crate) async fn write_companion<T: RepositoryTx>(
    tx: &mut T,
    before: &AccompanyingGuest,
    after: &AccompanyingGuest,
    action: AuditAction,
    ctx: &AuditContext,
) -> Result<()> {
    tx.update_accompanying(after).await?;
    tx.append_audit(&NewAuditEntry::changed(
        EntityType::AccompanyingGuest,
        *after.id.as_uuid(),
        action,
        before,
        after,
        ctx,
    ))
    .await
}

pub(crate) async fn remove_companion<T: RepositoryTx>(
    tx: &mut T,
    companion: &AccompanyingGuest,
    ctx: &AuditContext,
) -> Result<()> {
    tx.delete_accompanying(companion.id).await?;
    tx.append_audit(&NewAuditEntry::removed(
        EntityType::AccompanyingGuest,
        *companion.id.as_uuid(),
        companion,
        ctx,
    ))
    .await
}

pub(crate) async fn insert_guest<T: RepositoryTx>(
    tx: &mut T,
    guest: &Guest,
    ctx: &AuditContext,
) -> Result<()> {
    tx.insert_guest(guest).await?;
    tx.append_audit(&NewAuditEntry::created(EntityType::Guest, *guest.id.as_uuid(), guest, ctx))
        .await
}

pub(crate) async fn insert_invitation<T: RepositoryTx>(
    tx: &mut T,
    invitation: &Invitation,
    ctx: &AuditContext,
) -> Result<()> {
    tx.insert_invitation(invitation).await?;
    tx.append_audit(&NewAuditEntry::created(
        EntityType::Invitation,
        *invitation.id.as_uuid(),
        invitation,
        ctx,
    ))
    .await
}

pub(crate) async fn insert_companion<T: RepositoryTx>(
    tx: &mut T,
    companion: &AccompanyingGuest,
    ctx: &AuditContext,
) -> Result<()> {
    tx.insert_accompanying(companion).await?;
    tx.append_audit(&NewAuditEntry::created(
        EntityType::AccompanyingGuest,
        *companion.id.as_uuid(),
        companion,
        ctx,
    ))
    .await
}

/// Writes whatever the reducer changed between `before` and `after`.
pub(crate) async fn write_rsvp_diff<T: RepositoryTx>(
    tx: &mut T,
    before: &RsvpState,
    after: &mut RsvpState,
    ctx: &AuditContext,
) -> Result<()> {
    if after.invitation != before.invitation {
        write_invitation(tx, &before.invitation, &mut after.invitation, AuditAction::Update, ctx)
            .await?;
    }
    if after.guest != before.guest {
        write_guest(tx, &before.guest, &mut after.guest, AuditAction::Update, ctx).await?;
    }
    for companion in &after.accompanying {
        match before.accompanying.iter().find(|old| old.id == companion.id) {
            None => insert_companion(tx, companion, ctx).await?,
            Some(old) if old != companion => {
                write_companion(tx, old, companion, AuditAction::Update, ctx).await?;
            }
            Some(_) => {}
        }
    }
    for dropped in &before.accompanying {
        if !after.accompanying.iter().any(|kept| kept.id == dropped.id) {
            remove_companion(tx, dropped, ctx).await?;
        }
    }
    Ok(())
}
