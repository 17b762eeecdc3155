/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types and traits that are used across the message request trackers and their collaborators.

pub mod crypto_primitives;

pub mod data_types;
