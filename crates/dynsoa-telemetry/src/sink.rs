// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Best-effort CSV sink for raw metric samples.

use dynsoa_core::Sample;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const HEADER: &str =
    "kernel,view,time_us,p95_tile_us,p99_tile_us,warp_eff,branch_div,mem_coalesce,l2_miss_rate";

/// Appends one row per emitted sample to a CSV file.
///
/// All I/O is best-effort: a row that fails to write disables nothing and
/// is simply lost, matching the silent-degradation contract.
pub(crate) struct CsvSink {
    writer: BufWriter<File>,
}

impl CsvSink {
    /// Creates (truncating) the file and writes the header, flushed.
    pub(crate) fn create(path: &Path) -> Option<Self> {
        let file = match File::create(path) {
            Ok(f) => f,
            Err(e) => {
                log::warn!("metrics: failed to open CSV sink {}: {e}", path.display());
                return None;
            }
        };
        let mut writer = BufWriter::new(file);
        let _ = writeln!(writer, "{HEADER}");
        let _ = writer.flush();
        Some(Self { writer })
    }

    pub(crate) fn write_row(&mut self, s: &Sample) {
        let _ = writeln!(
            self.writer,
            "{},{},{},{},{},{},{},{},{}",
            s.kernel,
            s.view,
            s.time_us,
            s.p95_tile_us,
            s.p99_tile_us,
            s.warp_eff,
            s.branch_div,
            s.mem_coalesce,
            s.l2_miss_rate
        );
        let _ = self.writer.flush();
    }
}
