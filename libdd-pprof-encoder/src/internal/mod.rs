// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod aggregator;
mod function;
mod group_key;
mod label;
mod location;
mod location_table;
mod sample_type;

pub use aggregator::*;
pub use function::*;
pub use group_key::*;
pub use label::*;
pub use location::*;
pub use location_table::*;
pub use sample_type::*;

use crate::collections::*;
use crate::pprof;
use std::num::NonZeroU32;
