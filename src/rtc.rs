// /src/rtc.rs
use embassy_stm32::pac::{PWR, RCC, RTC};

use smsgate::{GsmTime, WallClock};

/// RTC control using LSI as clock source.
pub struct RtcControl {
    _private: (),
}

impl RtcControl {
    /// Initialize RTC; uses LSI (~40 kHz) as source.
    pub fn init() -> Self {
        // Enable PWR clock and backup access
        RCC.apb1enr().modify(|w| w.set_pwren(true));
        PWR.cr().modify(|w| w.set_dbp(true));

        RCC.csr().modify(|w| w.set_lsion(true));
        while !RCC.csr().read().lsirdy() {}

        RCC.bdcr().modify(|w| {
            w.set_rtcsel(embassy_stm32::pac::rcc::vals::Rtcsel::LSI);
            w.set_rtcen(true);
        });

        Self::with_init_mode(|| {
            // ~40 kHz / (127 + 1) / (311 + 1) = 1 Hz
            RTC.prer().modify(|w| {
                w.set_prediv_a(0x7F);
                w.set_prediv_s(0x0137);
            });
        });

        RtcControl { _private: () }
    }

    fn with_init_mode(f: impl FnOnce()) {
        let rtc = RTC;
        rtc.wpr().write(|w| w.set_key(0xCA));
        rtc.wpr().write(|w| w.set_key(0x53));

        rtc.isr().modify(|w| w.set_init(true));
        while !rtc.isr().read().initf() {}

        f();

        rtc.isr().modify(|w| w.set_init(false));
        rtc.wpr().write(|w| w.set_key(0xFF));
    }

    pub fn set_time(&mut self, time: GsmTime) {
        Self::with_init_mode(|| {
            RTC.dr().write(|w| {
                w.set_dt(time.day / 10);
                w.set_du(time.day % 10);
                w.set_mt(time.month >= 10);
                w.set_mu(time.month % 10);
                w.set_yt(time.year / 10);
                w.set_yu(time.year % 10);
            });
            RTC.tr().write(|w| {
                w.set_ht(time.hour / 10);
                w.set_hu(time.hour % 10);
                w.set_mnt(time.minute / 10);
                w.set_mnu(time.minute % 10);
                w.set_st(time.second / 10);
                w.set_su(time.second % 10);
            });
        });
    }

    pub fn get_time(&self) -> GsmTime {
        let rtc = RTC;
        rtc.isr().modify(|w| w.set_rsf(false));
        while !rtc.isr().read().rsf() {}

        let tr = rtc.tr().read();
        let dr = rtc.dr().read();

        GsmTime {
            year: dr.yt() * 10 + dr.yu(),
            month: (dr.mt() as u8) * 10 + dr.mu(),
            day: dr.dt() * 10 + dr.du(),
            hour: tr.ht() * 10 + tr.hu(),
            minute: tr.mnt() * 10 + tr.mnu(),
            second: tr.st() * 10 + tr.su(),
        }
    }
}

impl WallClock for RtcControl {
    fn now(&self) -> GsmTime {
        self.get_time()
    }
}
