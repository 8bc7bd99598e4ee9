/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Keyed registries with seeded defaults: node/edge types, palette items and
//! physics profiles.

pub mod palette;
pub mod physics_profile;
pub mod type_catalog;
