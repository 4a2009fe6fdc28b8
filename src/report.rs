//! Report protocol: paginated serialization of the registry.
//!
//! Each open session snapshots the chain head and streams one line per
//! entry, newest first: `"<target>+<offset> <callback>\n"`. A read emits
//! only lines that fit whole in the remaining space and stops at the first
//! one that does not; the next read resumes exactly there. `Ok(0)` means
//! the session is drained, or that even the first pending line does not
//! fit the supplied buffer.

use alloc::format;
use alloc::string::String;

use crate::entry::{ProbeEntry, REPORT_LINE_MAXLEN};
use crate::error::Error;
use crate::fs::UserBuf;
use crate::registry::{ProbeRef, ProbeRegistry};

/// Render the report line for one entry.
pub fn render_line(entry: &ProbeEntry) -> String {
    format!(
        "{}+{} {}\n",
        entry.target(),
        entry.offset(),
        entry.callback()
    )
}

enum Cursor {
    /// Nothing emitted yet; holds the head snapshot from open time.
    Start(Option<ProbeRef>),
    /// Last emitted entry; the next read resumes strictly after it.
    After(ProbeRef),
    /// Every snapshot entry has been emitted.
    Drained,
}

/// One open report session over the registry.
pub struct ReportSession {
    cursor: Cursor,
}

impl ReportSession {
    /// Open a session over the registry's current contents.
    ///
    /// The session dumps the entries reachable at open time; entries
    /// inserted afterwards are not part of this session. An empty registry
    /// yields an immediately drained session.
    pub fn open(registry: &ProbeRegistry) -> Self {
        Self {
            cursor: Cursor::Start(registry.head_ref()),
        }
    }

    /// Whether every snapshot entry has been emitted.
    pub fn is_drained(&self) -> bool {
        match &self.cursor {
            Cursor::Drained | Cursor::Start(None) => true,
            Cursor::Start(Some(_)) => false,
            Cursor::After(pos) => pos.next().is_none(),
        }
    }

    /// Serialize as many whole lines as fit into `buf`.
    ///
    /// Returns the bytes written. The cursor advances per successfully
    /// copied line, so a [`Error::TransferFault`] leaves it on the faulted
    /// line and a retry re-renders exactly that line.
    pub fn read<B: UserBuf + ?Sized>(&mut self, buf: &mut B) -> Result<usize, Error> {
        let mut next = match &self.cursor {
            Cursor::Start(head) => head.clone(),
            Cursor::After(pos) => pos.next(),
            Cursor::Drained => None,
        };

        let capacity = buf.capacity();
        let mut written = 0usize;
        loop {
            let Some(pos) = next else {
                self.cursor = Cursor::Drained;
                break;
            };

            let line = render_line(pos.entry());
            debug_assert!(line.len() <= REPORT_LINE_MAXLEN);
            if written + line.len() > capacity {
                // Never split a line; this entry leads the next read.
                break;
            }

            buf.copy_out(written, line.as_bytes())
                .map_err(|_| Error::TransferFault)?;
            written += line.len();
            next = pos.next();
            self.cursor = Cursor::After(pos);
        }

        Ok(written)
    }
}
