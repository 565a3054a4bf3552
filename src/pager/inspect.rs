use std::io::Write;

use frame_table::Pid;
use log::{debug, warn};

use super::Pager;
use crate::{error::PagerError, mmu::Mmu, store::BackingStore};

impl<M: Mmu, S: BackingStore, const PAGE_SIZE: usize> Pager<M, S, PAGE_SIZE> {
    /// Dumps `len` bytes of `pid` starting at `addr` to `out` as lowercase hex
    /// followed by a newline.
    ///
    /// Every page in the range must already be resident: this never faults a
    /// page in. Nothing is written to `out` unless the whole range is readable.
    pub fn read_range<W: Write>(
        &self,
        pid: Pid,
        addr: usize,
        len: usize,
        out: &mut W,
    ) -> Result<(), PagerError> {
        let process = self
            .procs
            .get(pid)
            .ok_or(PagerError::UnknownProcess(pid))?;
        let invalid = || PagerError::InvalidRange { pid, addr, len };
        let end = addr.checked_add(len).ok_or_else(invalid)?;

        // (frame, offset, chunk) pieces, all checked before anything is read.
        let mut pieces = Vec::new();
        let mut cursor = addr;
        while cursor < end {
            let Some(page) = process
                .page_index(cursor, self.config.base_addr, PAGE_SIZE)
                .and_then(|index| process.page(index))
            else {
                warn!("Process {} dump of {:#x} leaves its pages", pid, cursor);
                return Err(invalid());
            };
            let Some(frame) = page.frame else {
                warn!("Process {} dump touches non-resident page {:#x}", pid, page.vaddr);
                return Err(invalid());
            };
            let offset = cursor - page.vaddr;
            let chunk = (PAGE_SIZE - offset).min(end - cursor);
            pieces.push((frame, offset, chunk));
            cursor += chunk;
        }

        let mut bytes = vec![0; len];
        let mut start = 0;
        for (frame, offset, chunk) in pieces {
            self.mmu
                .read_frame(frame, offset, &mut bytes[start..start + chunk])?;
            start += chunk;
        }

        let mut dump: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        dump.push('\n');
        out.write_all(dump.as_bytes())?;
        debug!("Dumped {} bytes of process {} at {:#x}", len, pid, addr);
        Ok(())
    }
}
