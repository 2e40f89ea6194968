// Copyright (c) 2026 The nixie-rtc developers
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
// THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

use embedded_hal::i2c::{self, NoAcknowledgeSource};

use super::{Error, Status};

impl i2c::Error for Error {
    fn kind(&self) -> i2c::ErrorKind {
        match *self {
            Error::Status { status, .. } => match status {
                Status::SLA_W_NACK | Status::SLA_R_NACK => {
                    i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
                }
                Status::DATA_TX_NACK => i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data),
                Status::ARBITRATION_LOST => i2c::ErrorKind::ArbitrationLoss,
                Status::BUS_ERROR => i2c::ErrorKind::Bus,
                _ => i2c::ErrorKind::Other,
            },
            _ => i2c::ErrorKind::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal::i2c::{Error as _, ErrorKind, NoAcknowledgeSource};

    use super::super::{Error, Phase, Status};

    fn status(status: u8) -> Error {
        Error::Status {
            phase: Phase::Write,
            status,
        }
    }

    #[test]
    fn nack_kinds() {
        assert_eq!(
            status(Status::SLA_W_NACK).kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
        assert_eq!(
            status(Status::SLA_R_NACK).kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
        assert_eq!(
            status(Status::DATA_TX_NACK).kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
        );
    }

    #[test]
    fn other_kinds() {
        assert_eq!(
            status(Status::ARBITRATION_LOST).kind(),
            ErrorKind::ArbitrationLoss
        );
        assert_eq!(status(Status::BUS_ERROR).kind(), ErrorKind::Bus);
        assert_eq!(Error::Timeout(Phase::Start).kind(), ErrorKind::Other);
    }
}
