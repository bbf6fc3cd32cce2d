use crate::shdlc::START_STOP;

#[derive(PartialEq, Debug)]
pub(crate) enum ReadStatus {
    InProgress,
    /// Frame complete, holds its length including both markers.
    Finished(usize),
    Failed,
}

#[derive(PartialEq, Debug)]
enum State {
    WaitingForStart,
    Reading,
    Finished,
    Failed,
}

///
/// Collects one stuffed frame, markers included, from a stream of received bytes
///
pub(crate) struct ReadStateMachine<'a> {
    buffer: &'a mut [u8],
    index: usize,
    state: State,
}

impl<'a> ReadStateMachine<'a> {
    pub(crate) fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            index: 0,
            state: State::WaitingForStart,
        }
    }

    /// True once a start marker has been seen.
    pub(crate) fn started(&self) -> bool {
        self.state != State::WaitingForStart
    }

    fn start_read(&mut self) {
        self.buffer[0] = START_STOP;
        self.index = 1;
        self.state = State::Reading;
    }

    fn byte_read(&mut self, byte: u8) {
        if self.index == self.buffer.len() {
            self.state = State::Failed;
            return;
        }
        self.buffer[self.index] = byte;
        self.index += 1;
        if byte == START_STOP {
            self.state = State::Finished;
        }
    }

    pub(crate) fn update(&mut self, byte: u8) -> ReadStatus {
        match self.state {
            State::WaitingForStart => {
                if byte == START_STOP && !self.buffer.is_empty() {
                    self.start_read();
                }
            }
            // A marker right after the start marker closes nothing, so treat it as a new start.
            State::Reading if byte == START_STOP && self.index == 1 => {}
            State::Reading => self.byte_read(byte),
            State::Finished | State::Failed => {}
        };

        match self.state {
            State::WaitingForStart | State::Reading => ReadStatus::InProgress,
            State::Finished => ReadStatus::Finished(self.index),
            State::Failed => ReadStatus::Failed,
        }
    }
}
