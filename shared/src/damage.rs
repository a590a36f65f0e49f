//! Damage classification at the combat boundary.
//!
//! Upstream damage arrives with optional source ids; it is turned into a
//! [`DamageSource`] exactly once, and everything downstream matches on that.

use crate::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageCategory {
    Environmental,
    HostileEntity,
    Projectile,
    OtherAvatar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageSource {
    HostileEntity(u32),
    Projectile(u32),
    OtherAvatar(u32),
    /// Catch-all, including damage with no identifiable source.
    Environmental,
}

impl DamageSource {
    pub fn category(&self) -> DamageCategory {
        match self {
            DamageSource::HostileEntity(_) => DamageCategory::HostileEntity,
            DamageSource::Projectile(_) => DamageCategory::Projectile,
            DamageSource::OtherAvatar(_) => DamageCategory::OtherAvatar,
            DamageSource::Environmental => DamageCategory::Environmental,
        }
    }
}

/// Damage as reported by the combat layer, before classification.
#[derive(Debug, Clone, Default)]
pub struct IncomingDamage {
    pub hostile_entity: Option<u32>,
    pub projectile: Option<u32>,
    pub other_avatar: Option<u32>,
    pub amount: i32,
    pub knockback: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    pub source: DamageSource,
    pub base_amount: i32,
    pub knockback: Vec2,
}

impl DamageEvent {
    pub fn new(source: DamageSource, base_amount: i32) -> Self {
        Self {
            source,
            base_amount,
            knockback: Vec2::ZERO,
        }
    }

    pub fn category(&self) -> DamageCategory {
        self.source.category()
    }
}

impl From<IncomingDamage> for DamageEvent {
    fn from(incoming: IncomingDamage) -> Self {
        let source = if let Some(id) = incoming.hostile_entity {
            DamageSource::HostileEntity(id)
        } else if let Some(id) = incoming.projectile {
            DamageSource::Projectile(id)
        } else if let Some(id) = incoming.other_avatar {
            DamageSource::OtherAvatar(id)
        } else {
            DamageSource::Environmental
        };

        Self {
            source,
            base_amount: incoming.amount,
            knockback: incoming.knockback,
        }
    }
}
