//! Shared fixtures of the framer benchmarks.

#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    feed: Feed,
    file: TestFile,
}

impl TestCase {
    pub fn new(name: &'static str, feed: Feed, file: TestFile) -> Self {
        Self { name, feed, file }
    }

    /// The whole request arrives in one read
    pub fn single(name: &'static str, file: TestFile) -> Self {
        Self::new(name, Feed::Single, file)
    }

    /// `count` copies of the request arrive coalesced in one read
    pub fn pipelined(name: &'static str, file: TestFile, count: usize) -> Self {
        Self::new(name, Feed::Pipelined(count), file)
    }

    /// The request arrives one byte per read
    pub fn fragmented(name: &'static str, file: TestFile) -> Self {
        Self::new(name, Feed::Fragmented, file)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn feed(&self) -> Feed {
        self.feed
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }

    /// Number of requests the framer must produce
    pub fn expected_requests(&self) -> usize {
        match self.feed {
            Feed::Pipelined(count) => count,
            Feed::Single | Feed::Fragmented => 1,
        }
    }

    /// The bytes delivered by each simulated read, in order.
    pub fn reads(&self) -> Vec<Vec<u8>> {
        let content = self.file.content();
        match self.feed {
            Feed::Single => vec![content.to_vec()],
            Feed::Pipelined(count) => vec![content.repeat(count)],
            Feed::Fragmented => content.iter().map(|byte| vec![*byte]).collect(),
        }
    }

    /// Total bytes delivered across all reads
    pub fn total_bytes(&self) -> usize {
        self.file.content().len() * self.expected_requests()
    }
}

#[derive(Debug, Copy, Clone)]
pub struct TestFile {
    file_name: &'static str,
    content: &'static [u8],
}

impl TestFile {
    pub const fn new(file_name: &'static str, content: &'static [u8]) -> Self {
        Self { file_name, content }
    }

    pub fn content(&self) -> &'static [u8] {
        self.content
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }
}

/// How the bytes of a test case reach the framer.
#[derive(Clone, Copy, Debug)]
pub enum Feed {
    Single,
    Pipelined(usize),
    Fragmented,
}
