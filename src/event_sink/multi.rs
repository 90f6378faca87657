use super::{Result, async_trait, event::Event};

pub struct MultiSink {
    sinks: Vec<Box<dyn super::EventSink>>,
}

impl MultiSink {
    pub fn new(sinks: Vec<Box<dyn super::EventSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl super::EventSink for MultiSink {
    async fn record(&mut self, event: Event) -> Result<u64> {
        let mut updated = 0;
        for sink in &mut self.sinks {
            updated = updated.max(sink.record(event.clone()).await?);
        }
        Ok(updated)
    }

    async fn flush(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            sink.flush().await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            sink.close().await?;
        }
        Ok(())
    }
}
