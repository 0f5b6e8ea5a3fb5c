//! 波特率列表命令

use anyhow::Result;
use clap::Args;
use pcanlink_protocol::BITRATES;

/// 波特率列表参数
#[derive(Args, Debug)]
pub struct BitratesCommand {
    /// 只输出 kbit/s 数值（每行一个）
    #[arg(short, long)]
    pub quiet: bool,
}

impl BitratesCommand {
    pub fn execute(&self) -> Result<()> {
        if !self.quiet {
            println!("kbit/s  BTR0BTR1");
        }
        for bitrate in BITRATES.iter() {
            if self.quiet {
                println!("{}", bitrate.kbps);
            } else {
                println!("{:>6}  0x{:04X}", bitrate.kbps, bitrate.btr);
            }
        }
        Ok(())
    }
}
