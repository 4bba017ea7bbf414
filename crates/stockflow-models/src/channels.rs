//! Delivery-channel bitmask.
//!
//! A notification can target any combination of delivery channels. The mask
//! is stored as a small integer; set operations are plain bit arithmetic.

use serde::{Deserialize, Serialize};
use sqlx::{
    Database, Decode, Encode, Type,
    postgres::{PgHasArrayType, PgTypeInfo},
};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

/// A single delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    Email,
    Sms,
    Push,
}

impl Channel {
    /// All channels, in mask bit order.
    pub const ALL: [Channel; 4] = [Channel::InApp, Channel::Email, Channel::Sms, Channel::Push];

    /// The bit this channel occupies in a [`ChannelMask`].
    #[inline]
    pub const fn bit(self) -> u8 {
        match self {
            Channel::InApp => 1,
            Channel::Email => 2,
            Channel::Sms => 4,
            Channel::Push => 8,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Channel::InApp => "in_app",
            Channel::Email => "email",
            Channel::Sms => "sms",
            Channel::Push => "push",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bitset over delivery channels.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelMask(pub u8);

impl ChannelMask {
    /// No channels.
    pub const NONE: ChannelMask = ChannelMask(0);
    /// Every channel.
    pub const ALL: ChannelMask = ChannelMask(0b1111);
    /// The default mask for synthesized preferences.
    pub const IN_APP: ChannelMask = ChannelMask(1);

    /// A mask containing exactly one channel.
    #[inline]
    pub const fn only(channel: Channel) -> Self {
        Self(channel.bit())
    }

    /// Whether the mask contains the channel.
    #[inline]
    pub const fn contains(self, channel: Channel) -> bool {
        self.0 & channel.bit() != 0
    }

    /// Add a channel to the mask.
    #[inline]
    pub fn insert(&mut self, channel: Channel) {
        self.0 |= channel.bit();
    }

    /// Remove a channel from the mask.
    #[inline]
    pub fn remove(&mut self, channel: Channel) {
        self.0 &= !channel.bit();
    }

    /// Whether no channel is set.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The channels present in the mask, in bit order.
    pub fn channels(self) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|c| self.contains(*c))
            .collect()
    }
}

impl Default for ChannelMask {
    fn default() -> Self {
        Self::IN_APP
    }
}

impl From<Channel> for ChannelMask {
    fn from(channel: Channel) -> Self {
        Self::only(channel)
    }
}

impl FromIterator<Channel> for ChannelMask {
    fn from_iter<I: IntoIterator<Item = Channel>>(iter: I) -> Self {
        let mut mask = Self::NONE;
        for c in iter {
            mask.insert(c);
        }
        mask
    }
}

impl BitOr for ChannelMask {
    type Output = ChannelMask;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for ChannelMask {
    type Output = ChannelMask;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for ChannelMask {
    type Output = ChannelMask;

    fn not(self) -> Self {
        Self(!self.0 & Self::ALL.0)
    }
}

impl fmt::Debug for ChannelMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.channels().iter().map(|c| c.as_str()).collect();
        write!(f, "ChannelMask({})", names.join("|"))
    }
}

// Stored as SMALLINT in Postgres.
impl Type<sqlx::Postgres> for ChannelMask {
    fn type_info() -> PgTypeInfo {
        <i16 as Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <i16 as Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'q> Encode<'q, sqlx::Postgres> for ChannelMask {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i16 as Encode<'q, sqlx::Postgres>>::encode_by_ref(&(self.0 as i16), buf)
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for ChannelMask {
    fn decode(
        value: <sqlx::Postgres as Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let v = <i16 as Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(Self(v as u8))
    }
}

impl PgHasArrayType for ChannelMask {
    fn array_type_info() -> PgTypeInfo {
        <i16 as PgHasArrayType>::array_type_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_contains_and_mutation() {
        let mut mask = ChannelMask::only(Channel::InApp);
        assert!(mask.contains(Channel::InApp));
        assert!(!mask.contains(Channel::Email));

        mask.insert(Channel::Email);
        assert!(mask.contains(Channel::Email));

        mask.remove(Channel::InApp);
        assert!(!mask.contains(Channel::InApp));
        assert_eq!(mask, ChannelMask::only(Channel::Email));
    }

    #[test]
    fn mask_set_operations() {
        let a = ChannelMask::only(Channel::InApp) | ChannelMask::only(Channel::Push);
        let b = ChannelMask::only(Channel::Push) | ChannelMask::only(Channel::Email);
        assert_eq!(a & b, ChannelMask::only(Channel::Push));
        assert_eq!(a | b, ChannelMask(1 | 2 | 8));
        assert_eq!(!ChannelMask::ALL, ChannelMask::NONE);
    }

    #[test]
    fn intersection_is_idempotent() {
        let mask = ChannelMask(0b1010);
        assert_eq!(mask & mask, mask);
    }

    #[test]
    fn all_is_every_channel() {
        for c in Channel::ALL {
            assert!(ChannelMask::ALL.contains(c));
        }
        assert!(ChannelMask::NONE.is_empty());
    }

    #[test]
    fn channels_listing() {
        let mask = ChannelMask::only(Channel::Email) | ChannelMask::only(Channel::Push);
        assert_eq!(mask.channels(), vec![Channel::Email, Channel::Push]);
    }

    #[test]
    fn collect_from_iterator() {
        let mask: ChannelMask = [Channel::InApp, Channel::Sms].into_iter().collect();
        assert!(mask.contains(Channel::InApp));
        assert!(mask.contains(Channel::Sms));
        assert!(!mask.contains(Channel::Email));
    }
}
