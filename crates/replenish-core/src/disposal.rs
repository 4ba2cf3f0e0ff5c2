//! Disposal router: gets emptied holders off the deck.
//!
//! With a chute and a gripper the workcell destroys holders itself. Any
//! other installation needs the operator, so the router only detaches the
//! holders logically and hands back an instruction for the pause message.

use crate::config::WasteKind;
use crate::deck::{Destination, Movable, Workcell};
use crate::error::TrackerError;
use crate::id::{HolderId, ResourceType};
use crate::ledger::{HolderRecord, Ledger};
use crate::slot::{Slot, format_slots};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposalPath {
    /// Holders go to the chute through the gripper.
    Automated,
    /// The operator removes holders during a pause.
    Manual,
}

/// What one disposal removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisposalReceipt {
    pub resource: ResourceType,
    pub slots: Vec<Slot>,
    pub path: DisposalPath,
}

impl DisposalReceipt {
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The operator message for a manual disposal. `None` when nothing is
    /// left for the operator to do.
    pub fn operator_instruction(&self) -> Option<String> {
        if self.path == DisposalPath::Automated || self.slots.is_empty() {
            return None;
        }
        Some(format!(
            "Please remove all {} from slots {}",
            self.resource,
            format_slots(&self.slots)
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisposalRouter {
    waste: WasteKind,
    gripper: bool,
}

impl DisposalRouter {
    pub fn new(waste: WasteKind, gripper: bool) -> Self {
        Self { waste, gripper }
    }

    pub fn path(&self) -> DisposalPath {
        if self.waste == WasteKind::Chute && self.gripper {
            DisposalPath::Automated
        } else {
            DisposalPath::Manual
        }
    }

    pub fn is_automated(&self) -> bool {
        self.path() == DisposalPath::Automated
    }

    pub fn uses_gripper(&self) -> bool {
        self.gripper
    }

    /// Remove `holders` from the deck and from the ledger.
    pub fn dispose<W: Workcell>(
        &self,
        workcell: &mut W,
        ledger: &mut Ledger,
        resource: &ResourceType,
        holders: &[HolderRecord],
    ) -> Result<DisposalReceipt, TrackerError> {
        self.dispose_via(self.path(), workcell, ledger, resource, holders)
    }

    /// Like [`dispose`](Self::dispose) but with the path forced. Forcing
    /// [`DisposalPath::Automated`] without a chute and gripper downgrades to
    /// manual.
    pub fn dispose_via<W: Workcell>(
        &self,
        path: DisposalPath,
        workcell: &mut W,
        ledger: &mut Ledger,
        resource: &ResourceType,
        holders: &[HolderRecord],
    ) -> Result<DisposalReceipt, TrackerError> {
        let path = if self.is_automated() {
            path
        } else {
            DisposalPath::Manual
        };
        let mut slots = Vec::with_capacity(holders.len());
        for record in holders {
            match path {
                DisposalPath::Automated => {
                    workcell.transfer(Movable::Holder(record.id), Destination::Waste, true)?
                }
                DisposalPath::Manual => {
                    workcell.transfer(Movable::Holder(record.id), Destination::OffDeck, false)?
                }
            }
            ledger.remove(resource, record.id);
            slots.push(record.slot);
        }
        if !slots.is_empty() {
            tracing::info!(
                target: "disposal",
                resource = %resource,
                count = slots.len(),
                path = ?path,
                "holders_disposed"
            );
        }
        Ok(DisposalReceipt {
            resource: resource.clone(),
            slots,
            path,
        })
    }

    /// Drop the cover of a freshly dispensed holder into waste.
    pub fn discard_cover<W: Workcell>(
        &self,
        workcell: &mut W,
        holder: HolderId,
    ) -> Result<(), TrackerError> {
        workcell.transfer(Movable::Cover(holder), Destination::Waste, self.gripper)?;
        Ok(())
    }
}
