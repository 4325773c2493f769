use serde::{Deserialize, Serialize};

use super::InventoryError;

/// 蔵書数カウンタ
///
/// 不変条件：`0 <= available <= total` かつ `total >= 1`。
/// 値は不変で、保留・解放はすべて新しいカウンタを返す純粋関数として表現する。
/// 貸出中の冊数は `total - available` で導出され、保存しない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyCounter {
    total: u32,
    available: u32,
}

/// 解放の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// 1冊戻った
    Released(CopyCounter),
    /// 既に満杯だった（二重解放）。カウンタは変化しない
    Saturated(CopyCounter),
}

impl Release {
    pub fn counter(&self) -> CopyCounter {
        match self {
            Release::Released(c) | Release::Saturated(c) => *c,
        }
    }
}

impl CopyCounter {
    /// 新規登録：全冊が貸出可能
    pub fn new(total: u32) -> Result<Self, InventoryError> {
        if total == 0 {
            return Err(InventoryError::InvalidTotal(total));
        }
        Ok(Self {
            total,
            available: total,
        })
    }

    /// 永続化された値から復元する
    pub fn restore(total: u32, available: u32) -> Result<Self, InventoryError> {
        if total == 0 {
            return Err(InventoryError::InvalidTotal(total));
        }
        if available > total {
            return Err(InventoryError::Corrupted { total, available });
        }
        Ok(Self { total, available })
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn available(&self) -> u32 {
        self.available
    }

    /// 貸出中（予約中を含む）の冊数
    pub fn on_loan(&self) -> u32 {
        self.total - self.available
    }

    /// 全冊が書架にあるか
    pub fn is_idle(&self) -> bool {
        self.available == self.total
    }

    /// 1冊を保留する
    ///
    /// # エラー
    /// 貸出可能な冊数が0の場合は`InventoryError::OutOfStock`
    pub fn hold(self) -> Result<Self, InventoryError> {
        if self.available == 0 {
            return Err(InventoryError::OutOfStock);
        }
        Ok(Self {
            available: self.available - 1,
            ..self
        })
    }

    /// 1冊を解放する
    ///
    /// 総数を超える解放は呼び出し側のバグ。ここでは飽和させて`Saturated`を返し、
    /// 扱い（エラーにするか記録だけするか）は台帳の設定に委ねる。
    pub fn release(self) -> Release {
        if self.available >= self.total {
            return Release::Saturated(self);
        }
        Release::Released(Self {
            available: self.available + 1,
            ..self
        })
    }

    /// 総冊数を変更する
    ///
    /// 貸出中の冊数は維持され、差分だけ貸出可能数が増減する。
    ///
    /// # エラー
    /// - 0冊: `InventoryError::InvalidTotal`
    /// - 貸出中の冊数を下回る: `InventoryError::BelowOnLoan`
    pub fn resize(self, new_total: u32) -> Result<Self, InventoryError> {
        if new_total == 0 {
            return Err(InventoryError::InvalidTotal(new_total));
        }
        let on_loan = self.on_loan();
        if new_total < on_loan {
            return Err(InventoryError::BelowOnLoan {
                requested: new_total,
                on_loan,
            });
        }
        Ok(Self {
            total: new_total,
            available: new_total - on_loan,
        })
    }
}
